//! Stash builder API modules
//!
//! Provides the fluent API for assembling a cache interceptor and for
//! attaching cache directives to requests.

pub mod core;
pub mod directives;
pub mod hooks;

// Re-export all public types for convenience
pub use core::*;
pub use directives::*;
