//! Stash public API
//!
//! Disk-backed HTTP response caching in front of any transport. Build an
//! interceptor once, share it, and route requests through it:
//!
//! ```no_run
//! use stash::{CacheDirective, CacheRequestExt, HttpRequest, HttpResponse, Stash};
//!
//! let interceptor = Stash::in_directory("/tmp/stash").build();
//! let transport = |request: HttpRequest| -> stash::Result<HttpResponse> {
//!     Ok(HttpResponse::new(request).body("[]"))
//! };
//!
//! let request = HttpRequest::get(url::Url::parse("https://api.example.com/feed").unwrap())
//!     .cache(&[CacheDirective::CacheBefore]);
//! let response = interceptor.intercept(request, &transport).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;

// Re-export all public API components
pub use builder::*;

// Re-export important types from client package
pub use stash_client::{
    Body, CACHE_HEADER, CacheConfig, CacheInterceptor, CachePolicy, CacheStats, Error, Headers,
    HttpRequest, HttpResponse, Interceptor, InterceptorChain, Kind, NetworkState,
    Reachability, ResponseCache, Result, StaticReachability, Transport,
};

// HTTP primitives used in request and response builders
pub use http::{Method, StatusCode, Version};

/// Main entry point providing static builder methods
pub struct Stash;

impl Stash {
    /// Create a builder with the default configuration
    ///
    /// Shorthand for `StashBuilder::new()`
    #[must_use]
    pub fn builder() -> StashBuilder {
        StashBuilder::new()
    }

    /// Create a builder rooted at `directory`
    ///
    /// # Arguments
    /// * `directory` - Store directory; created on build
    ///
    /// # Returns
    /// `StashBuilder` for method chaining
    #[must_use]
    pub fn in_directory(directory: impl AsRef<std::path::Path>) -> StashBuilder {
        StashBuilder::with_config(CacheConfig::in_directory(directory))
    }
}

/// Create a builder with the default configuration
///
/// Shorthand for `StashBuilder::new()`
#[must_use]
pub fn builder() -> StashBuilder {
    StashBuilder::new()
}
