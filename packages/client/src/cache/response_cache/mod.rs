//! Response cache modules
//!
//! Disk-backed HTTP response cache keyed by request method and canonical URL.
//!
//! The functionality is organized into logical modules:
//!
//! - `core`: ResponseCache struct, opening and key derivation
//! - `operations`: get/put/remove against the disk store
//!
//! Every failure inside the cache is logged and downgraded: a broken entry is
//! a miss, a failed write is skipped, and a store that cannot be opened turns
//! the cache into a no-op.

pub mod core;
pub mod operations;

pub use core::ResponseCache;
