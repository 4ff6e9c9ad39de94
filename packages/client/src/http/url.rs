//! URL canonicalisation for cache identity

use url::Url;

/// Query parameter stripped from cache identity by default.
pub const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Removes every query parameter whose name is in `stripped`.
///
/// Remaining parameters keep their order and encoding. A query left empty is
/// dropped entirely, so `http://a/x?access_token=1` canonicalises to
/// `http://a/x`. Fragments are never part of cache identity.
#[must_use]
pub fn canonical_url<S: AsRef<str>>(url: &Url, stripped: &[S]) -> Url {
    let mut canonical = url.clone();
    canonical.set_fragment(None);

    let Some(query) = url.query() else {
        return canonical;
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let raw_name = pair.split('=').next().unwrap_or_default();
            let name = url::form_urlencoded::parse(raw_name.as_bytes())
                .next()
                .map(|(name, _)| name.into_owned())
                .unwrap_or_default();
            !stripped.iter().any(|s| s.as_ref() == name)
        })
        .collect();

    if kept.len() == query.split('&').count() {
        return canonical;
    }

    if kept.is_empty() {
        canonical.set_query(None);
    } else {
        canonical.set_query(Some(&kept.join("&")));
    }
    canonical
}

/// True for schemes whose entries carry a TLS handshake summary.
#[must_use]
pub fn is_secure(url: &str) -> bool {
    url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canon(raw: &str) -> String {
        canonical_url(&Url::parse(raw).unwrap(), &[ACCESS_TOKEN_PARAM]).to_string()
    }

    #[test]
    fn test_strips_access_token_anywhere_in_query() {
        assert_eq!(canon("http://a.com/p?x=1&access_token=s3cr3t&y=2"), "http://a.com/p?x=1&y=2");
        assert_eq!(canon("http://a.com/p?access_token=1&access_token=2"), "http://a.com/p");
    }

    #[test]
    fn test_keeps_unrelated_query_verbatim() {
        assert_eq!(canon("http://a.com/p?b=2&a=1"), "http://a.com/p?b=2&a=1");
        assert_eq!(canon("http://a.com/p?q=a%20b"), "http://a.com/p?q=a%20b");
        assert_eq!(canon("http://a.com/p"), "http://a.com/p");
    }

    #[test]
    fn test_drops_fragment() {
        assert_eq!(canon("http://a.com/p?x=1#frag"), "http://a.com/p?x=1");
    }

    #[test]
    fn test_percent_encoded_param_name_is_matched() {
        assert_eq!(canon("http://a.com/p?access%5Ftoken=1&x=2"), "http://a.com/p?x=2");
    }

    #[test]
    fn test_is_secure() {
        assert!(is_secure("https://a.com/"));
        assert!(!is_secure("http://a.com/"));
    }
}
