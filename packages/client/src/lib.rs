//! # Stash HTTP response cache
//!
//! Disk-backed response caching that sits in front of any HTTP transport.
//! Callers opt individual requests into caching with the `Stash-Cache`
//! request header; when the device reports no network, every request is
//! answered from the cache or with a synthesized `504`.
//!
//! ## Features
//!
//! - **Per-request directives**: `cache-before`, `refresh_cache`,
//!   `only-if-cached`, `no-cache`, `max-age=<seconds>`
//! - **Offline mode** driven by a pluggable reachability probe
//! - **Crash-safe disk store** with atomic entry replacement and LRU eviction
//! - **TLS-aware entries**: cipher suite, certificate chains and protocol
//!   version of secure responses are stored and restored
//! - **Credential stripping**: `access_token` never reaches a key or the disk
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stash_client::prelude::*;
//!
//! let cache = Arc::new(ResponseCache::open(&CacheConfig::in_directory("/tmp/stash")));
//! let interceptor = CacheInterceptor::new(cache);
//!
//! let transport = |request: HttpRequest| -> stash_client::Result<HttpResponse> {
//!     Ok(HttpResponse::new(request).body("{\"items\":[]}"))
//! };
//!
//! let request = HttpRequest::get(url::Url::parse("https://api.example.com/items").unwrap())
//!     .header(CACHE_HEADER, "cache-before, max-age=600");
//! let response = interceptor.intercept(request, &transport).unwrap();
//! assert!(response.is_success());
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

// Core modules
pub mod cache;
pub mod error;
pub mod http;
pub mod middleware;
pub mod network;
pub mod tls;

// Prelude with canonical types
pub mod prelude;

// Essential public API - only what end users actually need
pub use crate::prelude::*;
