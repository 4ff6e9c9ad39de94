//! Cache key derivation
//!
//! A key is the MD5 digest (lowercase hex) of the request method and its
//! canonical URL, i.e. the URL with volatile credentials such as
//! `access_token` removed. Headers never take part, so header order cannot
//! change the key, and stripped secrets never reach the store.

use std::fmt;

use http::Method;
use url::Url;

use crate::http::{HttpRequest, canonical_url};

/// Cache key for one logical request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Request URL with stripped query parameters removed
    pub canonical_url: Url,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    digest: String,
}

impl CacheKey {
    /// Derive the key for `request`, dropping the query parameters in `stripped`.
    pub fn for_request<S: AsRef<str>>(request: &HttpRequest, stripped: &[S]) -> Self {
        Self::new(request.method().clone(), canonical_url(request.url(), stripped))
    }

    /// Build a key from an already canonical URL.
    #[must_use]
    pub fn new(method: Method, canonical_url: Url) -> Self {
        let material = format!("{} {}", method.as_str(), canonical_url.as_str());
        let digest = hex::encode(md5::compute(material.as_bytes()).0);
        Self {
            canonical_url,
            method,
            digest,
        }
    }

    /// Hex digest used as the disk store key.
    #[must_use]
    pub fn hash_key(&self) -> &str {
        &self.digest
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ACCESS_TOKEN_PARAM;

    fn key(method: Method, url: &str, headers: &[(&str, &str)]) -> CacheKey {
        let request = HttpRequest::new(method, Url::parse(url).unwrap())
            .with_headers(headers.iter().copied().collect());
        CacheKey::for_request(&request, &[ACCESS_TOKEN_PARAM])
    }

    #[test]
    fn test_key_is_32_hex_chars() {
        let k = key(Method::GET, "http://example.com/a", &[]);
        assert_eq!(k.hash_key().len(), 32);
        assert!(k.hash_key().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(k.to_string(), k.hash_key());
    }

    #[test]
    fn test_stripped_param_and_header_order_do_not_matter() {
        let a = key(
            Method::GET,
            "http://example.com/a?x=1&access_token=one",
            &[("Accept", "a"), ("User-Agent", "u")],
        );
        let b = key(
            Method::GET,
            "http://example.com/a?x=1",
            &[("User-Agent", "u"), ("Accept", "a")],
        );
        let c = key(Method::GET, "http://example.com/a?access_token=two&x=1", &[]);
        assert_eq!(a, b);
        assert_eq!(a.hash_key(), c.hash_key());
        assert!(!a.canonical_url.as_str().contains("access_token"));
    }

    #[test]
    fn test_url_and_method_distinguish_keys() {
        let get = key(Method::GET, "http://example.com/a", &[]);
        let post = key(Method::POST, "http://example.com/a", &[]);
        let other = key(Method::GET, "http://example.com/b", &[]);
        let query = key(Method::GET, "http://example.com/a?page=2", &[]);
        assert_ne!(get.hash_key(), post.hash_key());
        assert_ne!(get.hash_key(), other.hash_key());
        assert_ne!(get.hash_key(), query.hash_key());
    }
}
