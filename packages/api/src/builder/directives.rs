//! Request-side cache directives
//!
//! Typed helpers for writing the `Stash-Cache` request header instead of
//! assembling the string by hand.

use std::fmt;

use stash_client::cache::CACHE_HEADER;
use stash_client::http::HttpRequest;

/// A single `Stash-Cache` directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDirective {
    /// Serve a stored response when present, otherwise fetch and store
    CacheBefore,
    /// Always fetch and overwrite the stored response
    RefreshCache,
    /// Never touch the network
    OnlyIfCached,
    /// Do not serve a stored response
    NoCache,
    /// Stored responses older than this many seconds are not served
    MaxAge(u32),
}

impl CacheDirective {
    /// Convert directive to its header form
    #[must_use]
    pub fn to_header_value(self) -> String {
        match self {
            CacheDirective::CacheBefore => "cache-before".to_string(),
            CacheDirective::RefreshCache => "refresh_cache".to_string(),
            CacheDirective::OnlyIfCached => "only-if-cached".to_string(),
            CacheDirective::NoCache => "no-cache".to_string(),
            CacheDirective::MaxAge(seconds) => format!("max-age={seconds}"),
        }
    }
}

impl fmt::Display for CacheDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_header_value())
    }
}

/// Header value for several directives
#[must_use]
pub fn header_value(directives: &[CacheDirective]) -> String {
    directives
        .iter()
        .map(|directive| directive.to_header_value())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Attach cache directives to a request
pub trait CacheRequestExt: Sized {
    /// Set the `Stash-Cache` header, replacing any previous value
    ///
    /// # Examples
    /// ```no_run
    /// use stash::{CacheDirective, CacheRequestExt, HttpRequest};
    ///
    /// let request = HttpRequest::get(url::Url::parse("https://api.example.com/feed").unwrap())
    ///     .cache(&[CacheDirective::CacheBefore, CacheDirective::MaxAge(600)]);
    /// ```
    #[must_use]
    fn cache(self, directives: &[CacheDirective]) -> Self;
}

impl CacheRequestExt for HttpRequest {
    fn cache(mut self, directives: &[CacheDirective]) -> Self {
        if directives.is_empty() {
            self.headers_mut().remove_all(CACHE_HEADER);
        } else {
            self.headers_mut().set(CACHE_HEADER, header_value(directives));
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use stash_client::cache::CachePolicy;
    use url::Url;

    use super::*;

    #[test]
    fn test_directives_parse_back() {
        let request = HttpRequest::get(Url::parse("http://example.com/").unwrap())
            .cache(&[CacheDirective::CacheBefore, CacheDirective::MaxAge(90)]);
        assert_eq!(
            request.headers().get(CACHE_HEADER),
            Some("cache-before, max-age=90")
        );

        let policy = CachePolicy::parse(request.headers());
        assert!(policy.read_enabled() && policy.write_enabled());
        assert_eq!(policy.max_age_seconds(), 90);
    }

    #[test]
    fn test_empty_directives_clear_header() {
        let request = HttpRequest::get(Url::parse("http://example.com/").unwrap())
            .cache(&[CacheDirective::OnlyIfCached])
            .cache(&[]);
        assert!(!request.headers().contains(CACHE_HEADER));
    }
}
