//! Stash prelude
//!
//! This module contains the essential types that end users need to put a
//! cache in front of a transport. Only canonical types that are part of the
//! public API belong here.

// Request/response model
pub use crate::http::{Body, Headers, HttpRequest, HttpResponse};

// Cache
pub use crate::cache::{CACHE_HEADER, CacheConfig, CachePolicy, CacheStats, ResponseCache};

// Interception
pub use crate::middleware::{
    AlwaysCacheable, CacheInterceptor, Cacheability, Interceptor, InterceptorChain, Transport,
};
pub use crate::network::{NetworkState, Reachability, StaticReachability};

// TLS summaries
pub use crate::tls::{Certificate, Handshake, TlsVersion};

// Error types
pub use crate::error::{Error, Kind, Result};

// HTTP standard types from http crate
pub use ::http::{Method, StatusCode, Version};
