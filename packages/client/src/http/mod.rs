//! HTTP value types used by the cache pipeline
//!
//! Requests, responses, an ordered header multimap, re-readable bodies and URL
//! canonicalisation. Standard types (`Method`, `StatusCode`, `Version`) come
//! from the `http` crate.

pub mod body;
pub mod headers;
pub mod request;
pub mod response;
pub mod url;

pub use body::Body;
pub use headers::{HeaderError, Headers, has_vary_all, vary_fields, vary_headers};
pub use request::HttpRequest;
pub use response::{HttpResponse, UNSATISFIABLE_MESSAGE, now_millis};
pub use self::url::{ACCESS_TOKEN_PARAM, canonical_url, is_secure};
