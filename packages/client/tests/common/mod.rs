//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use stash_client::prelude::*;
use tempfile::TempDir;
use url::Url;

pub fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

/// Cache in a fresh temp directory; keep the `TempDir` alive for the test.
pub fn open_cache() -> (TempDir, Arc<ResponseCache>) {
    let dir = tempfile::tempdir().unwrap();
    let cache = ResponseCache::open(&CacheConfig::in_directory(dir.path()));
    assert!(cache.is_available());
    (dir, Arc::new(cache))
}

/// Real DER certificate for handshake fixtures.
pub fn certificate(name: &str) -> Certificate {
    let certified = rcgen::generate_simple_self_signed(vec![name.to_string()]).unwrap();
    Certificate::from_der_unchecked(certified.cert.der().to_vec())
}

pub fn handshake() -> Handshake {
    Handshake::new("TLS_AES_128_GCM_SHA256")
        .peer_certificates(vec![certificate("api.example.com"), certificate("ca.example.com")])
        .tls_version(TlsVersion::Tls13)
}

/// Transport that counts calls and answers every request with `body`.
#[derive(Clone)]
pub struct CountingTransport {
    calls: Arc<AtomicUsize>,
    body: &'static str,
}

impl CountingTransport {
    pub fn new(body: &'static str) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            body,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for CountingTransport {
    fn proceed(&self, request: HttpRequest) -> stash_client::Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(
            !request.headers().contains(CACHE_HEADER),
            "cache header leaked to the network"
        );
        let secure = request.url().scheme() == "https";
        let response = HttpResponse::new(request)
            .header("Content-Type", "application/json")
            .body(Body::from_reader(Cursor::new(self.body.as_bytes())));
        Ok(if secure {
            response.handshake(Some(handshake()))
        } else {
            response
        })
    }
}
