//! Durable cache entry model
//!
//! A `CacheEntry` is everything about a response except its body: the
//! canonical request identity, the vary headers, the status line, the
//! response headers, the TLS summary and the send/receive timestamps. The body
//! is stored beside it in a second slot of the same disk store entry.

use http::{Method, StatusCode, Version};
use url::Url;

use crate::http::{Body, Headers, HttpRequest, HttpResponse, canonical_url, is_secure, vary_headers};
use crate::tls::Handshake;

/// Cached response metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Canonical URL of the request that produced the response
    pub url: String,
    pub request_method: Method,
    /// Request headers named by the response's `Vary` header, in request order
    pub vary_headers: Headers,
    pub protocol: Version,
    pub status_code: StatusCode,
    pub status_message: String,
    /// Response headers in wire order, duplicates preserved
    pub response_headers: Headers,
    /// Present exactly when `url` is https
    pub handshake: Option<Handshake>,
    pub sent_at_millis: i64,
    pub received_at_millis: i64,
}

impl CacheEntry {
    /// Captures the metadata of `response`, canonicalising its request URL.
    /// A handshake is kept only for https URLs.
    pub fn from_response<S: AsRef<str>>(response: &HttpResponse, stripped: &[S]) -> Self {
        let request = response.request();
        let url = canonical_url(request.url(), stripped).to_string();
        let handshake = response.tls_handshake().filter(|_| is_secure(&url)).cloned();
        Self {
            url,
            request_method: request.method().clone(),
            vary_headers: vary_headers(request.headers(), response.header_list()),
            protocol: response.http_version(),
            status_code: response.status_code(),
            status_message: response.status_message().to_string(),
            response_headers: response.header_list().clone(),
            handshake,
            sent_at_millis: response.sent_at(),
            received_at_millis: response.received_at(),
        }
    }

    #[must_use]
    pub fn is_secure(&self) -> bool {
        is_secure(&self.url)
    }

    /// Whether this entry answers `request`: same canonical URL, same method.
    ///
    /// Vary headers are stored but deliberately not compared.
    pub fn matches<S: AsRef<str>>(&self, request: &HttpRequest, stripped: &[S]) -> bool {
        self.url == canonical_url(request.url(), stripped).as_str()
            && &self.request_method == request.method()
    }

    /// Rebuilds a response around `body`. The attached request carries the
    /// stored URL, method and vary headers.
    pub fn into_response(self, body: Body) -> Result<HttpResponse, url::ParseError> {
        let url = Url::parse(&self.url)?;
        let request = HttpRequest::new(self.request_method, url).with_headers(self.vary_headers);

        Ok(HttpResponse::new(request)
            .version(self.protocol)
            .status(self.status_code)
            .message(self.status_message)
            .headers(self.response_headers)
            .handshake(self.handshake)
            .sent_at_millis(self.sent_at_millis)
            .received_at_millis(self.received_at_millis)
            .body(body))
    }
}
