//! File-system disk store
//!
//! Every entry is a single `<key>.entry` file: one little-endian `u64` length
//! per slot, followed by the slot bytes in order. Editors write each slot to
//! its own temp file and `commit` assembles the final file in another temp
//! file before renaming it into place, so readers observe either the old
//! entry or the new one. The assembled file and the directory are synced
//! around the rename, so a crash mid-write leaves the old entry intact.
//! Entries whose length disagrees with their slot headers are deleted on
//! first read.
//!
//! A `STORE` file records the format version and slot count. When either
//! changes, every entry is discarded on open.
//!
//! The in-memory index tracks entry sizes and access order for LRU eviction.
//! It is rebuilt from modification times whenever the store is opened.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use dashmap::DashSet;
use tempfile::NamedTempFile;

use super::{DiskStore, Editor, Snapshot};

const ENTRY_SUFFIX: &str = ".entry";
const TEMP_PREFIX: &str = ".tmp-";
const STORE_FILE: &str = "STORE";
const STORE_MAGIC: &str = "stash.disk-store";
const MAX_KEY_LEN: usize = 120;

/// Slot-based store rooted at one directory.
#[derive(Clone)]
pub struct FsDiskStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    directory: PathBuf,
    slot_count: usize,
    max_size_bytes: u64,
    index: Mutex<LruIndex>,
    editing: DashSet<String>,
}

#[derive(Debug, Default)]
struct LruIndex {
    entries: HashMap<String, IndexEntry>,
    total_bytes: u64,
    tick: u64,
}

#[derive(Debug, Clone, Copy)]
struct IndexEntry {
    size: u64,
    last_access: u64,
}

impl LruIndex {
    fn touch(&mut self, key: &str) {
        self.tick += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            entry.last_access = self.tick;
        }
    }

    fn insert(&mut self, key: String, size: u64) {
        self.tick += 1;
        let entry = IndexEntry {
            size,
            last_access: self.tick,
        };
        if let Some(previous) = self.entries.insert(key, entry) {
            self.total_bytes = self.total_bytes.saturating_sub(previous.size);
        }
        self.total_bytes += size;
    }

    fn remove(&mut self, key: &str) -> Option<IndexEntry> {
        let removed = self.entries.remove(key)?;
        self.total_bytes = self.total_bytes.saturating_sub(removed.size);
        Some(removed)
    }

    fn least_recently_used(&self, skip: impl Fn(&str) -> bool) -> Option<String> {
        self.entries
            .iter()
            .filter(|(key, _)| !skip(key))
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
    }
}

impl FsDiskStore {
    /// Opens (or creates) the store in `directory`.
    ///
    /// Entries written with a different `format_version` or `slot_count` are
    /// deleted, as are temp files left behind by an interrupted process.
    pub fn open(
        directory: impl AsRef<Path>,
        format_version: u32,
        slot_count: usize,
        max_size_bytes: u64,
    ) -> io::Result<Self> {
        if slot_count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "a disk store needs at least one slot per entry",
            ));
        }

        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;

        let expected = format!("{STORE_MAGIC}\n{format_version}\n{slot_count}\n");
        let current = match fs::read_to_string(directory.join(STORE_FILE)) {
            Ok(contents) => Some(contents),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        let compatible = current.as_deref() == Some(expected.as_str());

        let mut found = Vec::new();
        for dir_entry in fs::read_dir(&directory)? {
            let dir_entry = dir_entry?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if name.starts_with(TEMP_PREFIX) {
                remove_if_present(&dir_entry.path())?;
            } else if let Some(key) = name.strip_suffix(ENTRY_SUFFIX) {
                if compatible {
                    let metadata = dir_entry.metadata()?;
                    let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
                    found.push((modified, key.to_string(), metadata.len()));
                } else {
                    remove_if_present(&dir_entry.path())?;
                }
            }
        }

        if !compatible {
            tracing::debug!(
                target: "stash::cache::disk",
                directory = %directory.display(),
                format_version,
                slot_count,
                "Store format changed, discarded existing entries"
            );
            let mut store_file = tempfile::Builder::new()
                .prefix(TEMP_PREFIX)
                .tempfile_in(&directory)?;
            store_file.write_all(expected.as_bytes())?;
            store_file.as_file().sync_all()?;
            store_file
                .persist(directory.join(STORE_FILE))
                .map_err(|e| e.error)?;
        }

        found.sort();
        let mut index = LruIndex::default();
        for (_, key, size) in found {
            index.insert(key, size);
        }

        let store = Self {
            inner: Arc::new(StoreInner {
                directory,
                slot_count,
                max_size_bytes,
                index: Mutex::new(index),
                editing: DashSet::new(),
            }),
        };

        {
            let mut index = store.inner.lock_index();
            store.inner.evict(&mut index);
        }

        tracing::debug!(
            target: "stash::cache::disk",
            directory = %store.inner.directory.display(),
            entries = store.len(),
            bytes = store.size_bytes(),
            "Opened disk store"
        );
        Ok(store)
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.inner.directory
    }

    /// Total bytes of committed entries, slot headers included.
    #[must_use]
    pub fn size_bytes(&self) -> u64 {
        self.inner.lock_index().total_bytes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock_index().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock_index().entries.contains_key(key)
    }
}

impl std::fmt::Debug for FsDiskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsDiskStore")
            .field("directory", &self.inner.directory)
            .field("slot_count", &self.inner.slot_count)
            .field("max_size_bytes", &self.inner.max_size_bytes)
            .finish_non_exhaustive()
    }
}

impl StoreInner {
    fn lock_index(&self) -> MutexGuard<'_, LruIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry_path(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && key.len() <= MAX_KEY_LEN
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid disk store key {key:?}"),
            ));
        }
        Ok(self.directory.join(format!("{key}{ENTRY_SUFFIX}")))
    }

    fn temp_file(&self) -> io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.directory)
    }

    /// Deletes a damaged entry unless a commit replaced it since `opened` was
    /// taken. Holding the index lock excludes concurrent commits.
    fn discard_corrupt(&self, key: &str, path: &Path, opened: &fs::Metadata) -> io::Result<()> {
        let mut index = self.lock_index();
        match fs::metadata(path) {
            Ok(current) if same_version(&current, opened) => {
                index.remove(key);
                remove_if_present(path)
            }
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                index.remove(key);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Drops least-recently-used entries until the store fits. Entries with
    /// an open editor are never evicted.
    fn evict(&self, index: &mut LruIndex) {
        while index.total_bytes > self.max_size_bytes {
            let Some(key) = index.least_recently_used(|key| self.editing.contains(key)) else {
                break;
            };
            index.remove(&key);

            let removed = self
                .entry_path(&key)
                .and_then(|path| remove_if_present(&path));
            match removed {
                Ok(()) => tracing::debug!(
                    target: "stash::cache::disk",
                    key = %key,
                    total_bytes = index.total_bytes,
                    "Evicted least recently used entry"
                ),
                Err(error) => tracing::warn!(
                    target: "stash::cache::disk",
                    key = %key,
                    error = %error,
                    "Failed to delete evicted entry"
                ),
            }
        }
    }
}

impl DiskStore for FsDiskStore {
    fn edit(&self, key: &str) -> io::Result<Option<Box<dyn Editor>>> {
        self.inner.entry_path(key)?;
        if !self.inner.editing.insert(key.to_string()) {
            return Ok(None);
        }

        let slots = (0..self.inner.slot_count).map(|_| None).collect();
        Ok(Some(Box::new(FsEditor {
            store: Arc::clone(&self.inner),
            key: key.to_string(),
            slots,
        })))
    }

    fn get(&self, key: &str) -> io::Result<Option<Box<dyn Snapshot>>> {
        let path = self.inner.entry_path(key)?;
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let metadata = file.metadata()?;
        let Some(ranges) = read_slot_ranges(&mut file, self.inner.slot_count, metadata.len())? else {
            tracing::warn!(
                target: "stash::cache::disk",
                key = %key,
                bytes = metadata.len(),
                "Entry length does not match its slot headers, discarding"
            );
            self.inner.discard_corrupt(key, &path, &metadata)?;
            return Ok(None);
        };

        self.inner.lock_index().touch(key);
        Ok(Some(Box::new(FsSnapshot { file, ranges })))
    }

    fn remove(&self, key: &str) -> io::Result<bool> {
        let path = self.inner.entry_path(key)?;
        if self.inner.editing.contains(key) {
            return Ok(false);
        }

        let mut index = self.inner.lock_index();
        index.remove(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

struct FsEditor {
    store: Arc<StoreInner>,
    key: String,
    slots: Vec<Option<NamedTempFile>>,
}

impl Editor for FsEditor {
    fn new_output_stream(&mut self, slot: usize) -> io::Result<Box<dyn Write + Send + '_>> {
        let Some(target) = self.slots.get_mut(slot) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("slot {slot} out of range for {}", self.key),
            ));
        };
        let file = target.insert(self.store.temp_file()?);
        Ok(Box::new(file.as_file_mut()))
    }

    fn commit(mut self: Box<Self>) -> io::Result<()> {
        let mut slots = Vec::with_capacity(self.slots.len());
        for (slot, file) in self.slots.iter_mut().enumerate() {
            let Some(file) = file.take() else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("slot {slot} of {} was never written", self.key),
                ));
            };
            slots.push(file);
        }

        let mut assembled = self.store.temp_file()?;
        {
            let mut out = BufWriter::new(assembled.as_file_mut());
            for slot in &slots {
                out.write_all(&slot.as_file().metadata()?.len().to_le_bytes())?;
            }
            for slot in &mut slots {
                let file = slot.as_file_mut();
                file.seek(SeekFrom::Start(0))?;
                io::copy(file, &mut out)?;
            }
            out.flush()?;
        }
        let size = assembled.as_file().metadata()?.len();

        assembled.as_file().sync_all()?;

        let path = self.store.entry_path(&self.key)?;
        let mut index = self.store.lock_index();
        assembled.persist(&path).map_err(|e| e.error)?;
        sync_directory(&self.store.directory)?;
        index.insert(self.key.clone(), size);
        self.store.evict(&mut index);
        Ok(())
    }

    fn abort(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for FsEditor {
    fn drop(&mut self) {
        self.store.editing.remove(&self.key);
    }
}

struct FsSnapshot {
    file: File,
    ranges: Vec<(u64, u64)>,
}

impl Snapshot for FsSnapshot {
    /// Streams of one snapshot share a file cursor; read them from one
    /// thread at a time.
    fn input_stream(&mut self, slot: usize) -> io::Result<Box<dyn Read + Send>> {
        let Some(&(offset, length)) = self.ranges.get(slot) else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("slot {slot} out of range"),
            ));
        };
        Ok(Box::new(SlotReader {
            file: self.file.try_clone()?,
            position: offset,
            end: offset + length,
        }))
    }
}

struct SlotReader {
    file: File,
    position: u64,
    end: u64,
}

impl Read for SlotReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.end.saturating_sub(self.position);
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let limit = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));

        self.file.seek(SeekFrom::Start(self.position))?;
        let read = self.file.read(&mut buf[..limit])?;
        self.position += read as u64;
        Ok(read)
    }
}

/// Slot `(offset, length)` pairs, or `None` when the file is shorter than its
/// header or its length disagrees with the slot lengths.
fn read_slot_ranges(
    file: &mut File,
    slot_count: usize,
    file_len: u64,
) -> io::Result<Option<Vec<(u64, u64)>>> {
    let mut header = vec![0u8; slot_count * 8];
    match file.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let mut offset = header.len() as u64;
    let mut ranges = Vec::with_capacity(slot_count);
    for chunk in header.chunks_exact(8) {
        let mut length = [0u8; 8];
        length.copy_from_slice(chunk);
        let length = u64::from_le_bytes(length);
        ranges.push((offset, length));
        offset = offset.saturating_add(length);
    }
    Ok((offset == file_len).then_some(ranges))
}

/// Makes a completed rename durable.
#[cfg(unix)]
fn sync_directory(directory: &Path) -> io::Result<()> {
    File::open(directory)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_directory: &Path) -> io::Result<()> {
    Ok(())
}

fn same_version(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok()
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::super::read_slot;
    use super::*;

    fn write(store: &FsDiskStore, key: &str, meta: &[u8], body: &[u8]) {
        let mut editor = store.edit(key).unwrap().unwrap();
        editor.new_output_stream(0).unwrap().write_all(meta).unwrap();
        editor.new_output_stream(1).unwrap().write_all(body).unwrap();
        editor.commit().unwrap();
    }

    fn read(store: &FsDiskStore, key: &str) -> Option<(Vec<u8>, Vec<u8>)> {
        let mut snapshot = store.get(key).unwrap()?;
        let meta = read_slot(snapshot.as_mut(), 0).unwrap();
        let body = read_slot(snapshot.as_mut(), 1).unwrap();
        Some((meta, body))
    }

    #[test]
    fn test_commit_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();

        assert!(store.get("abc").unwrap().is_none());
        write(&store, "abc", b"meta", b"body bytes");
        assert_eq!(read(&store, "abc"), Some((b"meta".to_vec(), b"body bytes".to_vec())));
        assert_eq!(store.size_bytes(), 16 + 4 + 10);
    }

    #[test]
    fn test_single_editor_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();

        let first = store.edit("k").unwrap().unwrap();
        assert!(store.edit("k").unwrap().is_none());
        assert!(store.edit("other").unwrap().is_some());
        assert!(!store.remove("k").unwrap());
        drop(first);
        assert!(store.edit("k").unwrap().is_some());
    }

    #[test]
    fn test_abort_and_incomplete_commit_leave_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();

        let mut editor = store.edit("k").unwrap().unwrap();
        editor.new_output_stream(0).unwrap().write_all(b"meta").unwrap();
        editor.abort().unwrap();
        assert!(store.get("k").unwrap().is_none());

        let mut editor = store.edit("k").unwrap().unwrap();
        editor.new_output_stream(0).unwrap().write_all(b"meta").unwrap();
        assert!(editor.commit().is_err());
        assert!(store.get("k").unwrap().is_none());

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_snapshot_survives_replacement_and_removal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();
        write(&store, "k", b"old", b"old body");

        let mut snapshot = store.get("k").unwrap().unwrap();
        write(&store, "k", b"new", b"new body");
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());

        assert_eq!(read_slot(snapshot.as_mut(), 0).unwrap(), b"old");
        assert_eq!(read_slot(snapshot.as_mut(), 1).unwrap(), b"old body");
        assert!(store.get("k").unwrap().is_none());
    }

    #[test]
    fn test_lru_eviction() {
        let dir = tempfile::tempdir().unwrap();
        // each entry: 16 header bytes + 4 + 4
        let store = FsDiskStore::open(dir.path(), 1, 2, 60).unwrap();
        write(&store, "a", b"aaaa", b"aaaa");
        write(&store, "b", b"bbbb", b"bbbb");
        assert!(read(&store, "a").is_some());
        write(&store, "c", b"cccc", b"cccc");

        assert!(store.contains("a"));
        assert!(!store.contains("b"));
        assert!(store.contains("c"));
        assert!(store.get("b").unwrap().is_none());
        assert!(store.size_bytes() <= 60);
    }

    #[test]
    fn test_reopen_keeps_entries_until_version_changes() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();
            write(&store, "k", b"meta", b"body");
        }

        let reopened = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(read(&reopened, "k").is_some());
        drop(reopened);

        let bumped = FsDiskStore::open(dir.path(), 2, 2, 1 << 20).unwrap();
        assert!(bumped.is_empty());
        assert!(bumped.get("k").unwrap().is_none());
    }

    #[test]
    fn test_truncated_entry_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();
        write(&store, "k", b"meta", b"body bytes");
        write(&store, "short", b"meta", b"body");

        let path = dir.path().join("k.entry");
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();
        fs::write(dir.path().join("short.entry"), [1u8, 0, 0]).unwrap();

        for key in ["k", "short"] {
            assert!(store.get(key).unwrap().is_none(), "{key} was served");
            assert!(!dir.path().join(format!("{key}.entry")).exists());
            assert!(!store.contains(key));
        }
        assert_eq!(store.size_bytes(), 0);

        write(&store, "k", b"meta", b"again");
        assert_eq!(read(&store, "k"), Some((b"meta".to_vec(), b"again".to_vec())));
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsDiskStore::open(dir.path(), 1, 2, 1 << 20).unwrap();
        assert!(store.edit("../escape").is_err());
        assert!(store.get("").is_err());
        assert!(store.edit("STORE").is_ok());
    }
}
