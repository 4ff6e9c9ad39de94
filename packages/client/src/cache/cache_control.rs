//! Cache directive parsing
//!
//! Callers opt a request into caching with the `Stash-Cache` request header.
//! Its value is a list of `directive[=parameter]` items separated by `,` or
//! `;`, for example `Stash-Cache: cache-before, max-age=600`. The header is
//! removed before the request reaches the network.

use crate::http::Headers;

/// Name of the request header carrying cache directives.
pub const CACHE_HEADER: &str = "Stash-Cache";

/// Resolved read/write/freshness decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    suppress_read: bool,
    read_allowed: bool,
    write_allowed: bool,
    max_age_seconds: i32,
    cache_only: bool,
    header_value: Option<String>,
}

impl Default for CachePolicy {
    /// No caching involvement: network only, nothing read or written.
    fn default() -> Self {
        Self {
            suppress_read: false,
            read_allowed: false,
            write_allowed: false,
            max_age_seconds: -1,
            cache_only: false,
            header_value: None,
        }
    }
}

impl CachePolicy {
    /// Serve only from the store. Used for explicit `only-if-cached` and
    /// whenever there is no network.
    #[must_use]
    pub fn only_if_cached() -> Self {
        Self {
            cache_only: true,
            read_allowed: true,
            header_value: Some("only-if-cached".to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn no_cache() -> Self {
        Self {
            suppress_read: true,
            header_value: Some("no-cache".to_string()),
            ..Self::default()
        }
    }

    /// Prefer a stored response; otherwise fetch and store.
    #[must_use]
    pub fn cache_before() -> Self {
        Self {
            suppress_read: true,
            read_allowed: true,
            write_allowed: true,
            header_value: Some("cache-before".to_string()),
            ..Self::default()
        }
    }

    /// Always fetch, always rewrite the stored response, never read it.
    #[must_use]
    pub fn refresh_cache() -> Self {
        Self {
            write_allowed: true,
            header_value: Some("refresh_cache".to_string()),
            ..Self::default()
        }
    }

    /// Parses every `Stash-Cache` header in `headers` into one policy.
    ///
    /// Directives from all occurrences are merged. Unknown directives are
    /// ignored and a malformed `max-age` leaves the age unspecified.
    #[must_use]
    pub fn parse(headers: &Headers) -> Self {
        let mut policy = Self::default();
        let mut occurrences = 0usize;

        for (name, value) in headers.iter() {
            if !name.eq_ignore_ascii_case(CACHE_HEADER) {
                continue;
            }

            occurrences += 1;
            if occurrences == 1 {
                policy.header_value = Some(value.to_string());
            }

            for (directive, parameter) in Directives::new(value) {
                policy.apply(directive, parameter);
            }
        }

        if occurrences > 1 {
            policy.header_value = None;
        }
        policy
    }

    fn apply(&mut self, directive: &str, parameter: Option<&str>) {
        if directive.eq_ignore_ascii_case("no-cache") {
            self.suppress_read = true;
        } else if directive.eq_ignore_ascii_case("max-age") {
            self.max_age_seconds = parse_seconds(parameter, -1);
        } else if directive.eq_ignore_ascii_case("only-if-cached") {
            self.cache_only = true;
            self.read_allowed = true;
        } else if directive == "cache-before" {
            self.suppress_read = true;
            self.read_allowed = true;
            self.write_allowed = true;
        } else if directive == "refresh_cache" {
            self.write_allowed = true;
        }
    }

    #[must_use]
    pub fn suppress_read(&self) -> bool {
        self.suppress_read
    }

    #[must_use]
    pub fn read_enabled(&self) -> bool {
        self.read_allowed
    }

    #[must_use]
    pub fn write_enabled(&self) -> bool {
        self.write_allowed
    }

    /// Freshness bound in seconds; `-1` when unspecified.
    #[must_use]
    pub fn max_age_seconds(&self) -> i32 {
        self.max_age_seconds
    }

    #[must_use]
    pub fn cache_only(&self) -> bool {
        self.cache_only
    }

    /// True when the cache takes no part in the request at all.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        !self.read_allowed && !self.write_allowed && !self.cache_only
    }

    /// The raw header value, when the header appeared exactly once.
    #[must_use]
    pub fn header_value(&self) -> Option<&str> {
        self.header_value.as_deref()
    }

    /// Whether a response received at `received_at_millis` still satisfies
    /// `max-age` at `now_millis`. Always true when no age was given.
    #[must_use]
    pub fn is_fresh(&self, received_at_millis: i64, now_millis: i64) -> bool {
        if self.max_age_seconds < 0 {
            return true;
        }
        now_millis.saturating_sub(received_at_millis) <= i64::from(self.max_age_seconds) * 1000
    }
}

/// Parses a delta-seconds value: negative clamps to 0, overflow clamps to
/// `i32::MAX`, anything non-numeric yields `default`.
fn parse_seconds(value: Option<&str>, default: i32) -> i32 {
    let Some(value) = value else {
        return default;
    };
    match value.parse::<i64>() {
        Ok(seconds) if seconds > i64::from(i32::MAX) => i32::MAX,
        Ok(seconds) if seconds < 0 => 0,
        Ok(seconds) => i32::try_from(seconds).unwrap_or(default),
        Err(e) if matches!(e.kind(), std::num::IntErrorKind::PosOverflow) => i32::MAX,
        Err(_) => default,
    }
}

/// Iterator over `(directive, parameter)` pairs of one header value.
struct Directives<'a> {
    value: &'a str,
    pos: usize,
}

impl<'a> Directives<'a> {
    fn new(value: &'a str) -> Self {
        Self { value, pos: 0 }
    }

    fn skip_until(&self, from: usize, chars: &[u8]) -> usize {
        self.value.as_bytes()[from..]
            .iter()
            .position(|b| chars.contains(b))
            .map_or(self.value.len(), |offset| from + offset)
    }

    fn skip_whitespace(&self, from: usize) -> usize {
        self.value.as_bytes()[from..]
            .iter()
            .position(|b| *b != b' ' && *b != b'\t')
            .map_or(self.value.len(), |offset| from + offset)
    }
}

impl<'a> Iterator for Directives<'a> {
    type Item = (&'a str, Option<&'a str>);

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.value.as_bytes();
        if self.pos >= bytes.len() {
            return None;
        }

        let token_start = self.pos;
        let mut pos = self.skip_until(token_start, b"=,;");
        let directive = self.value[token_start..pos].trim();

        let parameter = if pos == bytes.len() || bytes[pos] == b',' || bytes[pos] == b';' {
            pos += 1;
            None
        } else {
            // '='
            pos = self.skip_whitespace(pos + 1);

            if pos < bytes.len() && bytes[pos] == b'"' {
                let parameter_start = pos + 1;
                pos = self.skip_until(parameter_start, b"\"");
                let parameter = &self.value[parameter_start..pos];
                // closing quote, then whatever precedes the next separator
                pos = self.skip_until((pos + 1).min(bytes.len()), b",;") + 1;
                Some(parameter)
            } else {
                let parameter_start = pos;
                pos = self.skip_until(parameter_start, b",;");
                let parameter = self.value[parameter_start..pos].trim();
                pos += 1;
                Some(parameter)
            }
        };

        self.pos = pos;
        Some((directive, parameter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(values: &[&str]) -> CachePolicy {
        let headers: Headers = values.iter().map(|v| (CACHE_HEADER, *v)).collect();
        CachePolicy::parse(&headers)
    }

    #[test]
    fn test_no_cache() {
        let policy = parse(&["no-cache"]);
        assert!(policy.suppress_read());
        assert!(!policy.read_enabled());
        assert!(!policy.write_enabled());
    }

    #[test]
    fn test_max_age() {
        assert_eq!(parse(&["max-age=120"]).max_age_seconds(), 120);
        assert_eq!(parse(&["max-age=\"60\""]).max_age_seconds(), 60);
        assert_eq!(parse(&["max-age=notanumber"]).max_age_seconds(), -1);
        assert_eq!(parse(&["max-age=-5"]).max_age_seconds(), 0);
        assert_eq!(parse(&["max-age=99999999999"]).max_age_seconds(), i32::MAX);
        assert_eq!(parse(&["max-age"]).max_age_seconds(), -1);
    }

    #[test]
    fn test_only_if_cached() {
        let policy = parse(&["only-if-cached"]);
        assert!(policy.cache_only());
        assert!(policy.read_enabled());
        assert!(!policy.write_enabled());
        assert_eq!(policy, CachePolicy::only_if_cached());
    }

    #[test]
    fn test_cache_before_and_refresh() {
        let before = parse(&["cache-before"]);
        assert!(before.suppress_read() && before.read_enabled() && before.write_enabled());

        let refresh = parse(&["refresh_cache"]);
        assert!(refresh.write_enabled());
        assert!(!refresh.read_enabled());
        assert!(!refresh.suppress_read());
    }

    #[test]
    fn test_custom_directives_are_case_sensitive() {
        assert!(parse(&["Cache-Before"]).is_passthrough());
        assert!(parse(&["NO-CACHE"]).suppress_read());
    }

    #[test]
    fn test_absent_and_empty_header_is_passthrough() {
        assert!(CachePolicy::parse(&Headers::new()).is_passthrough());
        assert_eq!(CachePolicy::parse(&Headers::new()), CachePolicy::default());
        assert!(parse(&[""]).is_passthrough());
    }

    #[test]
    fn test_only_named_header_is_scanned() {
        let headers: Headers = [("Cache-Control", "only-if-cached"), ("Accept", "cache-before")]
            .into_iter()
            .collect();
        assert!(CachePolicy::parse(&headers).is_passthrough());
    }

    #[test]
    fn test_separators_and_unknown_directives() {
        let policy = parse(&["foo=\"a,b\"; cache-before ,max-age = 30;bar"]);
        assert!(policy.write_enabled());
        assert_eq!(policy.max_age_seconds(), 30);
        assert_eq!(policy.header_value(), Some("foo=\"a,b\"; cache-before ,max-age = 30;bar"));
    }

    #[test]
    fn test_multiple_headers_merge_and_drop_raw_value() {
        let policy = parse(&["refresh_cache", "max-age=10"]);
        assert!(policy.write_enabled());
        assert_eq!(policy.max_age_seconds(), 10);
        assert_eq!(policy.header_value(), None);

        let headers: Headers = [("stash-cache", "only-if-cached")].into_iter().collect();
        assert_eq!(CachePolicy::parse(&headers).header_value(), Some("only-if-cached"));
    }

    #[test]
    fn test_freshness() {
        let policy = parse(&["max-age=60"]);
        assert!(policy.is_fresh(1_000, 61_000));
        assert!(!policy.is_fresh(1_000, 61_001));
        assert!(CachePolicy::cache_before().is_fresh(0, i64::MAX));
    }
}
