//! Ordered header multimap
//!
//! `http::HeaderMap` groups values by name and lowercases names, which loses the
//! wire order of interleaved duplicates. Cached entries must reproduce response
//! headers exactly as received, so requests and responses carry `Headers`, an
//! insertion-ordered list of name/value pairs with case-insensitive lookup.

use std::collections::BTreeSet;
use std::fmt;

use http::{HeaderMap, HeaderName, HeaderValue};
use thiserror::Error;

/// Header-related errors.
#[derive(Debug, Clone, Error)]
pub enum HeaderError {
    /// A `Name: Value` line had no colon.
    #[error("unexpected header: {line}")]
    MissingColon {
        /// The offending line
        line: String,
    },
    /// The header name or value cannot be represented in an `http::HeaderMap`.
    #[error("invalid header {name}: {message}")]
    Invalid {
        /// Header name as received
        name: String,
        /// Error message from the `http` crate
        message: String,
    },
}

/// Ordered, duplicate-preserving collection of header name/value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header. The value is trimmed the same way a parsed line is.
    pub fn add(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        self.entries
            .push((name.into(), value.as_ref().trim().to_string()));
    }

    /// Appends a header from a `Name: Value` line.
    pub fn add_line(&mut self, line: &str) -> Result<(), HeaderError> {
        let Some(index) = line.find(':') else {
            return Err(HeaderError::MissingColon {
                line: line.to_string(),
            });
        };
        self.add(line[..index].trim(), &line[index + 1..]);
        Ok(())
    }

    /// Replaces every header with this name by a single value.
    pub fn set(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        let name = name.into();
        self.remove_all(&name);
        self.add(name, value);
    }

    /// Removes every header with this name, case-insensitively.
    pub fn remove_all(&mut self, name: &str) {
        self.entries.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    /// Returns the last value for this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All values for this name, in order.
    pub fn values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts into an `http::HeaderMap`, failing on names or values the
    /// `http` crate rejects.
    pub fn to_header_map(&self) -> Result<HeaderMap, HeaderError> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| HeaderError::Invalid {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| HeaderError::Invalid {
                name: name.clone(),
                message: e.to_string(),
            })?;
            map.append(header_name, header_value);
        }
        Ok(map)
    }
}

impl<N: Into<String>, V: AsRef<str>> FromIterator<(N, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.add(name, value);
        }
        headers
    }
}

impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value))
            })
            .collect()
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            writeln!(f, "{name}: {value}")?;
        }
        Ok(())
    }
}

/// Field names listed by every `Vary` header of a response, lowercased.
#[must_use]
pub fn vary_fields(response_headers: &Headers) -> BTreeSet<String> {
    response_headers
        .values("Vary")
        .flat_map(|value| value.split(','))
        .map(|field| field.trim().to_ascii_lowercase())
        .filter(|field| !field.is_empty())
        .collect()
}

/// True when the response varies on every request header (`Vary: *`).
#[must_use]
pub fn has_vary_all(response_headers: &Headers) -> bool {
    vary_fields(response_headers).contains("*")
}

/// The request headers a response's `Vary` declaration names, in request order.
#[must_use]
pub fn vary_headers(request_headers: &Headers, response_headers: &Headers) -> Headers {
    let fields = vary_fields(response_headers);
    if fields.is_empty() {
        return Headers::new();
    }

    request_headers
        .iter()
        .filter(|(name, _)| fields.contains(&name.to_ascii_lowercase()))
        .collect()
}
