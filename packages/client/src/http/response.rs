//! HTTP response type seen by the cache pipeline
//!
//! A response keeps the request that produced it (the cache derives its key
//! from that request), the status line, ordered headers, the optional TLS
//! handshake summary, send/receive timestamps and a single-read body.

use std::time::{SystemTime, UNIX_EPOCH};

use http::{StatusCode, Version};

use super::body::Body;
use super::headers::Headers;
use super::request::HttpRequest;
use crate::tls::Handshake;

/// Status message of the response synthesized when an offline or
/// `only-if-cached` request has nothing stored.
pub const UNSATISFIABLE_MESSAGE: &str = "Unsatisfiable Request (only-if-cached)";

/// An HTTP response.
#[derive(Debug)]
pub struct HttpResponse {
    request: HttpRequest,
    version: Version,
    status: StatusCode,
    message: String,
    headers: Headers,
    handshake: Option<Handshake>,
    sent_at_millis: i64,
    received_at_millis: i64,
    body: Body,
}

impl HttpResponse {
    /// Creates a `200 OK` HTTP/1.1 response to `request` with an empty body,
    /// stamped with the current time.
    #[must_use]
    pub fn new(request: HttpRequest) -> Self {
        let now = now_millis();
        Self {
            request,
            version: Version::HTTP_11,
            status: StatusCode::OK,
            message: "OK".to_string(),
            headers: Headers::new(),
            handshake: None,
            sent_at_millis: now,
            received_at_millis: now,
            body: Body::empty(),
        }
    }

    /// The `504` response returned when a cache-only request finds nothing.
    #[must_use]
    pub fn unsatisfiable(request: HttpRequest) -> Self {
        Self::new(request)
            .status(StatusCode::GATEWAY_TIMEOUT)
            .message(UNSATISFIABLE_MESSAGE)
    }

    #[must_use]
    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.headers.add(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn handshake(mut self, handshake: Option<Handshake>) -> Self {
        self.handshake = handshake;
        self
    }

    #[must_use]
    pub fn sent_at_millis(mut self, millis: i64) -> Self {
        self.sent_at_millis = millis;
        self
    }

    #[must_use]
    pub fn received_at_millis(mut self, millis: i64) -> Self {
        self.received_at_millis = millis;
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the body, handing back the response and the previous body.
    #[must_use]
    pub fn take_body(mut self) -> (Self, Body) {
        let body = std::mem::take(&mut self.body);
        (self, body)
    }

    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    #[must_use]
    pub fn http_version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn status_message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn header_list(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn tls_handshake(&self) -> Option<&Handshake> {
        self.handshake.as_ref()
    }

    #[must_use]
    pub fn sent_at(&self) -> i64 {
        self.sent_at_millis
    }

    #[must_use]
    pub fn received_at(&self) -> i64 {
        self.received_at_millis
    }

    #[must_use]
    pub fn body_ref(&self) -> &Body {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `Content-Type` as declared by the response headers.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("Content-Type")
    }

    /// `Content-Length` as declared by the response headers; `None` when absent
    /// or not a number.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.headers
            .get("Content-Length")
            .and_then(|value| value.parse().ok())
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
