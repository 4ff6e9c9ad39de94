//! Core `StashBuilder` structure and base functionality
//!
//! Contains the builder that assembles a `CacheInterceptor` from a
//! `CacheConfig` and the host hooks (reachability, cacheability, certificate
//! codec).

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use stash_client::cache::{CacheConfig, EntryCodec, ResponseCache};
use stash_client::middleware::{Cacheability, CacheInterceptor};
use stash_client::network::Reachability;
use stash_client::tls::CertificateCodec;

/// Fluent builder for a cache interceptor
#[derive(Clone)]
pub struct StashBuilder {
    /// Store configuration
    pub(crate) config: CacheConfig,
    /// Connectivity probe; online when unset
    pub(crate) reachability: Option<Arc<dyn Reachability>>,
    /// Body predicate; every body is cacheable when unset
    pub(crate) cacheability: Option<Arc<dyn Cacheability>>,
    /// Certificate codec; x509-parser backed when unset
    pub(crate) certificates: Option<Arc<dyn CertificateCodec>>,
    /// Debug logging enabled flag
    pub(crate) debug_enabled: bool,
}

impl Default for StashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StashBuilder {
    /// Start from the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Start from an existing configuration
    ///
    /// # Arguments
    /// * `config` - Store configuration, e.g. loaded from a host config file
    ///
    /// # Returns
    /// `Self` for method chaining
    #[must_use]
    pub fn with_config(config: CacheConfig) -> Self {
        Self {
            config,
            reachability: None,
            cacheability: None,
            certificates: None,
            debug_enabled: false,
        }
    }

    /// Enable debug logging of the assembled configuration
    ///
    /// # Returns
    /// `Self` for method chaining
    #[must_use]
    pub fn debug(mut self) -> Self {
        self.debug_enabled = true;
        self
    }

    /// Set the store directory
    ///
    /// # Arguments
    /// * `directory` - Directory holding the entries; created on build
    ///
    /// # Returns
    /// `Self` for method chaining
    ///
    /// # Examples
    /// ```no_run
    /// use stash::StashBuilder;
    ///
    /// let interceptor = StashBuilder::new()
    ///     .directory("/var/cache/my-app/http")
    ///     .max_size_bytes(50 * 1024 * 1024)
    ///     .build();
    /// ```
    #[must_use]
    pub fn directory(mut self, directory: impl AsRef<Path>) -> Self {
        self.config.directory = directory.as_ref().to_path_buf();
        self
    }

    /// Set the LRU size limit
    #[must_use]
    pub fn max_size_bytes(mut self, max_size_bytes: u64) -> Self {
        self.config.max_size_bytes = max_size_bytes;
        self
    }

    /// Set the entry format version. Entries written under any other version
    /// are discarded when the store opens.
    #[must_use]
    pub fn format_version(mut self, format_version: u32) -> Self {
        self.config.format_version = format_version;
        self
    }

    /// Add a query parameter that never reaches a cache key or the disk
    ///
    /// # Arguments
    /// * `name` - Query parameter name, e.g. `"signature"`
    ///
    /// # Returns
    /// `Self` for method chaining
    #[must_use]
    pub fn strip_query_param(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.config.stripped_query_params.contains(&name) {
            self.config.stripped_query_params.push(name);
        }
        self
    }

    /// The configuration assembled so far
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Open the store and assemble the interceptor
    ///
    /// A store that cannot be opened is logged and leaves the interceptor in
    /// pass-through mode; see [`try_build`](Self::try_build) to observe the
    /// failure instead.
    #[must_use]
    pub fn build(self) -> CacheInterceptor {
        let cache = ResponseCache::open(&self.config);
        self.assemble(cache)
    }

    /// Open the store and assemble the interceptor, failing when the store
    /// cannot be opened
    pub fn try_build(self) -> stash_client::Result<CacheInterceptor> {
        let cache = ResponseCache::try_open(&self.config)?;
        Ok(self.assemble(cache))
    }

    fn assemble(self, cache: ResponseCache) -> CacheInterceptor {
        let cache = match self.certificates {
            Some(certificates) => cache.with_codec(EntryCodec::new(certificates)),
            None => cache,
        };

        if self.debug_enabled {
            tracing::debug!(
                target: "stash::builder",
                directory = %self.config.directory.display(),
                max_size_bytes = self.config.max_size_bytes,
                format_version = self.config.format_version,
                stripped = ?self.config.stripped_query_params,
                available = cache.is_available(),
                "Assembled cache interceptor"
            );
        }

        let mut interceptor = CacheInterceptor::new(Arc::new(cache));
        if let Some(reachability) = self.reachability {
            interceptor = interceptor.with_shared_reachability(reachability);
        }
        if let Some(cacheability) = self.cacheability {
            interceptor = interceptor.with_shared_cacheability(cacheability);
        }
        interceptor
    }
}

impl fmt::Debug for StashBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StashBuilder")
            .field("config", &self.config)
            .field("reachability", &self.reachability.is_some())
            .field("cacheability", &self.cacheability.is_some())
            .field("certificates", &self.certificates.is_some())
            .field("debug_enabled", &self.debug_enabled)
            .finish()
    }
}
