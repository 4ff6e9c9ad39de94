//! Cache interceptor for HTTP requests/responses
//!
//! Decides per request whether to answer from the cache, go to the network,
//! or both. The decision comes from the `Stash-Cache` request header, except
//! when the device is offline: then every request is treated as
//! `only-if-cached`.
//!
//! Transport errors are returned unchanged. Cache failures never are; they
//! degrade to a miss or a skipped write inside `ResponseCache`.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{AlwaysCacheable, Cacheability, Interceptor, Transport};
use crate::cache::{CACHE_HEADER, CachePolicy, ResponseCache};
use crate::error::{self, Result};
use crate::http::{Body, HttpRequest, HttpResponse, now_millis};
use crate::network::{Reachability, StaticReachability};

/// Response cache in front of a transport
pub struct CacheInterceptor {
    cache: Arc<ResponseCache>,
    reachability: Arc<dyn Reachability>,
    cacheability: Arc<dyn Cacheability>,
}

impl CacheInterceptor {
    /// Interceptor that assumes the network is up and caches every body it
    /// is allowed to.
    #[must_use]
    pub fn new(cache: Arc<ResponseCache>) -> Self {
        Self {
            cache,
            reachability: Arc::new(StaticReachability::online()),
            cacheability: Arc::new(AlwaysCacheable),
        }
    }

    #[must_use]
    pub fn with_reachability<R: Reachability + 'static>(self, reachability: R) -> Self {
        self.with_shared_reachability(Arc::new(reachability))
    }

    #[must_use]
    pub fn with_shared_reachability(mut self, reachability: Arc<dyn Reachability>) -> Self {
        self.reachability = reachability;
        self
    }

    #[must_use]
    pub fn with_cacheability<C: Cacheability + 'static>(self, cacheability: C) -> Self {
        self.with_shared_cacheability(Arc::new(cacheability))
    }

    #[must_use]
    pub fn with_shared_cacheability(mut self, cacheability: Arc<dyn Cacheability>) -> Self {
        self.cacheability = cacheability;
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Policy that applies to `request` right now.
    pub fn policy_for(&self, request: &HttpRequest) -> CachePolicy {
        let state = self.reachability.network_state();
        if state.is_connected() {
            CachePolicy::parse(request.headers())
        } else {
            tracing::debug!(
                target: "stash::middleware::cache",
                url = %request.url(),
                "No network, serving from cache only"
            );
            CachePolicy::only_if_cached()
        }
    }

    /// Answer `request` from the cache or through `transport`.
    pub fn intercept(&self, request: HttpRequest, transport: &dyn Transport) -> Result<HttpResponse> {
        let policy = self.policy_for(&request);

        if policy.read_enabled() {
            match self.cache.get(&request) {
                Some(cached)
                    if policy.cache_only() || policy.is_fresh(cached.received_at(), now_millis()) =>
                {
                    tracing::debug!(
                        target: "stash::middleware::cache",
                        method = %request.method(),
                        url = %request.url(),
                        "Served from cache"
                    );
                    return Ok(cached);
                }
                Some(stale) => {
                    tracing::debug!(
                        target: "stash::middleware::cache",
                        url = %request.url(),
                        received_at = stale.received_at(),
                        max_age = policy.max_age_seconds(),
                        "Cached response is stale"
                    );
                    self.cache.stats().record_stale();
                    drop(stale);
                }
                None if policy.cache_only() => {
                    tracing::debug!(
                        target: "stash::middleware::cache",
                        url = %request.url(),
                        "Cache-only request has no stored response"
                    );
                    return Ok(HttpResponse::unsatisfiable(request.without_header(CACHE_HEADER)));
                }
                None => {}
            }
        }

        let outgoing = request.without_header(CACHE_HEADER);
        drop(request);
        self.cache.stats().record_network_fetch();

        if policy.is_passthrough() {
            return transport.proceed(outgoing);
        }

        let (response, body) = transport.proceed(outgoing)?.take_body();
        let bytes = body
            .into_bytes()
            .map_err(|e| error::body(e).with_url(response.request().url().clone()))?;
        let response = response.body(Body::Buffered(bytes));

        if policy.write_enabled() && self.is_cacheable(&response) {
            self.cache.put(&response);
        }
        Ok(response)
    }

    fn is_cacheable(&self, response: &HttpResponse) -> bool {
        let text = match response.body_ref().as_bytes() {
            Some(bytes) => String::from_utf8_lossy(bytes),
            None => return false,
        };
        let verdict = panic::catch_unwind(AssertUnwindSafe(|| {
            self.cacheability.is_response_cacheable(&text)
        }));
        match verdict {
            Ok(cacheable) => {
                if !cacheable {
                    tracing::debug!(
                        target: "stash::middleware::cache",
                        url = %response.request().url(),
                        "Response rejected by cacheability check"
                    );
                }
                cacheable
            }
            Err(_) => {
                tracing::warn!(
                    target: "stash::middleware::cache",
                    url = %response.request().url(),
                    "Cacheability check panicked, response not cached"
                );
                false
            }
        }
    }
}

impl Interceptor for CacheInterceptor {
    fn intercept(&self, request: HttpRequest, next: &dyn Transport) -> Result<HttpResponse> {
        Self::intercept(self, request, next)
    }
}

impl std::fmt::Debug for CacheInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheInterceptor")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
