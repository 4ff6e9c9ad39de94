//! Host hooks
//!
//! Connectivity, body cacheability and certificate handling are supplied by
//! the embedding application.

use std::sync::Arc;

use stash_client::middleware::Cacheability;
use stash_client::network::{NetworkState, Reachability, StaticReachability};
use stash_client::tls::CertificateCodec;

use crate::builder::core::StashBuilder;

impl StashBuilder {
    /// Probe connectivity before every request
    ///
    /// # Arguments
    /// * `reachability` - Anything implementing `Reachability`, including
    ///   `Fn() -> NetworkState` closures
    ///
    /// # Returns
    /// `Self` for method chaining
    ///
    /// # Examples
    /// ```no_run
    /// use stash::{NetworkState, StashBuilder};
    ///
    /// let interceptor = StashBuilder::new()
    ///     .reachability(|| NetworkState::Wifi)
    ///     .build();
    /// ```
    #[must_use]
    pub fn reachability<R: Reachability + 'static>(mut self, reachability: R) -> Self {
        self.reachability = Some(Arc::new(reachability));
        self
    }

    /// Treat the device as having no network: every request is answered
    /// from the cache or with a 504.
    #[must_use]
    pub fn offline(self) -> Self {
        self.reachability(StaticReachability(NetworkState::None))
    }

    /// Decide per body whether a fetched response may be stored
    ///
    /// # Arguments
    /// * `predicate` - Receives the body as UTF-8 text (lossy); a panic counts
    ///   as "not cacheable"
    ///
    /// # Returns
    /// `Self` for method chaining
    ///
    /// # Examples
    /// ```no_run
    /// use stash::StashBuilder;
    ///
    /// let interceptor = StashBuilder::new()
    ///     .cacheable(|body: &str| !body.contains("\"error\""))
    ///     .build();
    /// ```
    #[must_use]
    pub fn cacheable<C: Cacheability + 'static>(mut self, predicate: C) -> Self {
        self.cacheability = Some(Arc::new(predicate));
        self
    }

    /// Replace the certificate codec used for secure entries
    #[must_use]
    pub fn certificate_codec<C: CertificateCodec + 'static>(mut self, codec: C) -> Self {
        self.certificates = Some(Arc::new(codec));
        self
    }
}
