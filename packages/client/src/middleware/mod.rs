//! Request interception
//!
//! An `Interceptor` sees every request on its way to the network and decides
//! whether to answer it itself or hand it to the next `Transport`. Chains of
//! interceptors are built with `InterceptorChain`, which is itself a
//! `Transport`.

use std::sync::Arc;

use crate::error::Result;
use crate::http::{HttpRequest, HttpResponse};

/// Whatever delivers a request when no interceptor answers it.
pub trait Transport: Send + Sync {
    fn proceed(&self, request: HttpRequest) -> Result<HttpResponse>;
}

impl<F> Transport for F
where
    F: Fn(HttpRequest) -> Result<HttpResponse> + Send + Sync,
{
    fn proceed(&self, request: HttpRequest) -> Result<HttpResponse> {
        self(request)
    }
}

/// Host-supplied judgement on whether a body is worth storing.
pub trait Cacheability: Send + Sync {
    fn is_response_cacheable(&self, body: &str) -> bool;
}

impl<F> Cacheability for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_response_cacheable(&self, body: &str) -> bool {
        self(body)
    }
}

/// Accepts every body.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysCacheable;

impl Cacheability for AlwaysCacheable {
    fn is_response_cacheable(&self, _body: &str) -> bool {
        true
    }
}

/// Request interceptor
pub trait Interceptor: Send + Sync {
    /// Answer `request`, usually by calling `next.proceed`.
    fn intercept(&self, request: HttpRequest, next: &dyn Transport) -> Result<HttpResponse>;
}

/// Interceptors applied in order in front of a terminal transport.
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl InterceptorChain {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            interceptors: Vec::new(),
            transport: Arc::new(transport),
        }
    }

    #[must_use]
    pub fn add<I: Interceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    #[must_use]
    pub fn add_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl Transport for InterceptorChain {
    fn proceed(&self, request: HttpRequest) -> Result<HttpResponse> {
        Next {
            interceptors: &self.interceptors,
            transport: self.transport.as_ref(),
        }
        .proceed(request)
    }
}

/// Remainder of a chain as seen by one interceptor.
struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl Transport for Next<'_> {
    fn proceed(&self, request: HttpRequest) -> Result<HttpResponse> {
        match self.interceptors.split_first() {
            Some((first, rest)) => first.intercept(
                request,
                &Next {
                    interceptors: rest,
                    transport: self.transport,
                },
            ),
            None => self.transport.proceed(request),
        }
    }
}

/// Cache interceptor module
pub mod cache;
pub use cache::CacheInterceptor;
