//! Disk-backed HTTP response caching
//!
//! This module provides the pieces the cache interceptor is built from:
//! - `cache_control`: the `Stash-Cache` request header and its directives
//! - `cache_key`: MD5 keys over method and canonical URL
//! - `cache_entry` / `codec`: the stored metadata and its line format
//! - `disk`: the slot-based store boundary and its file-system implementation
//! - `response_cache`: get/put/remove tying the above together

pub mod cache_config;
pub mod cache_control;
pub mod cache_entry;
pub mod cache_key;
pub mod cache_stats;
pub mod codec;
pub mod disk;
pub mod response_cache;

// Re-export all public types and functions
pub use cache_config::{CacheConfig, ConfigError, DEFAULT_FORMAT_VERSION};
pub use cache_control::{CACHE_HEADER, CachePolicy};
pub use cache_entry::CacheEntry;
pub use cache_key::CacheKey;
pub use cache_stats::{CacheStats, StatsSnapshot};
pub use codec::{CodecError, EntryCodec, RECEIVED_MILLIS_HEADER, SENT_MILLIS_HEADER};
pub use disk::{DiskStore, Editor, FsDiskStore, Snapshot};
pub use response_cache::ResponseCache;
