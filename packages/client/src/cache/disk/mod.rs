//! Disk store boundary
//!
//! The response cache talks to persistent storage through three traits:
//! a `DiskStore` hands out at most one `Editor` per key and any number of
//! read-only `Snapshot`s. Each entry holds a fixed number of byte slots; the
//! response cache uses slot 0 for metadata and slot 1 for the body.
//!
//! `FsDiskStore` is the bundled file-system implementation.

pub mod edit;
pub mod fs_store;

use std::io::{self, Read, Write};

pub use edit::{Edit, EditError, EditState};
pub use fs_store::FsDiskStore;

/// Slot holding the encoded entry metadata.
pub const METADATA_SLOT: usize = 0;
/// Slot holding the raw response body.
pub const BODY_SLOT: usize = 1;
/// Slots per entry used by the response cache.
pub const SLOT_COUNT: usize = 2;

/// Keyed, slot-based persistent storage.
pub trait DiskStore: Send + Sync {
    /// Opens an editor for `key`, or `None` when another editor for the same
    /// key is still open.
    fn edit(&self, key: &str) -> io::Result<Option<Box<dyn Editor>>>;

    /// Opens a read-only view of the committed entry for `key`.
    fn get(&self, key: &str) -> io::Result<Option<Box<dyn Snapshot>>>;

    /// Removes the entry for `key`. Returns `false` when nothing was removed.
    fn remove(&self, key: &str) -> io::Result<bool>;
}

/// Exclusive writer for one entry. Dropping an editor without committing
/// discards everything it wrote.
pub trait Editor: Send {
    /// Returns a fresh stream for `slot`, replacing anything written to it
    /// earlier in this edit.
    fn new_output_stream(&mut self, slot: usize) -> io::Result<Box<dyn Write + Send + '_>>;

    /// Publishes every slot at once. All slots must have been written.
    fn commit(self: Box<Self>) -> io::Result<()>;

    fn abort(self: Box<Self>) -> io::Result<()>;
}

/// Read-only view of a committed entry, released on drop.
///
/// A snapshot keeps reading the data it was opened on even if the entry is
/// replaced or removed afterwards.
pub trait Snapshot: Send {
    fn input_stream(&mut self, slot: usize) -> io::Result<Box<dyn Read + Send>>;
}

/// Reads a whole slot into memory.
pub fn read_slot(snapshot: &mut dyn Snapshot, slot: usize) -> io::Result<Vec<u8>> {
    let mut bytes = Vec::new();
    snapshot.input_stream(slot)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}
