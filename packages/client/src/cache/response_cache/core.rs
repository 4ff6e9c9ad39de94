//! Core ResponseCache structure and initialization

use std::sync::Arc;

use super::super::cache_config::CacheConfig;
use super::super::cache_key::CacheKey;
use super::super::cache_stats::CacheStats;
use super::super::codec::EntryCodec;
use super::super::disk::{DiskStore, FsDiskStore, SLOT_COUNT};
use crate::error::{self, Result};
use crate::http::HttpRequest;

/// HTTP response cache over a slot-based disk store
pub struct ResponseCache {
    /// `None` when the store could not be opened; every operation is then a no-op
    pub(super) store: Option<Arc<dyn DiskStore>>,
    pub(super) codec: EntryCodec,
    pub(super) stripped_params: Vec<String>,
    pub(super) stats: CacheStats,
}

impl ResponseCache {
    /// Opens the file-system store described by `config`.
    ///
    /// A store that fails to open is logged once and leaves the cache
    /// disabled rather than failing the caller.
    #[must_use]
    pub fn open(config: &CacheConfig) -> Self {
        match Self::try_open(config) {
            Ok(cache) => cache,
            Err(error) => {
                tracing::error!(
                    target: "stash::cache::response_cache",
                    directory = %config.directory.display(),
                    error = %error,
                    "Cache store unavailable, caching disabled"
                );
                Self::disabled_with(config)
            }
        }
    }

    /// Like [`open`](Self::open), but reports why the store is unusable.
    pub fn try_open(config: &CacheConfig) -> Result<Self> {
        config.validate()?;
        let store = FsDiskStore::open(
            &config.directory,
            config.format_version,
            SLOT_COUNT,
            config.max_size_bytes,
        )
        .map_err(error::store)?;
        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Uses an already opened store.
    #[must_use]
    pub fn with_store(store: Arc<dyn DiskStore>, config: &CacheConfig) -> Self {
        Self {
            store: Some(store),
            ..Self::disabled_with(config)
        }
    }

    /// A cache that never stores or returns anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self::disabled_with(&CacheConfig::default())
    }

    fn disabled_with(config: &CacheConfig) -> Self {
        Self {
            store: None,
            codec: EntryCodec::default(),
            stripped_params: config.stripped_query_params.clone(),
            stats: CacheStats::default(),
        }
    }

    /// Replaces the entry codec, e.g. to plug in another certificate codec.
    #[must_use]
    pub fn with_codec(mut self, codec: EntryCodec) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Query parameters removed before keying
    pub fn stripped_params(&self) -> &[String] {
        &self.stripped_params
    }

    /// Key under which a response to `request` is stored.
    pub fn key_for(&self, request: &HttpRequest) -> CacheKey {
        CacheKey::for_request(request, &self.stripped_params)
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("available", &self.is_available())
            .field("stripped_params", &self.stripped_params)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}
