//! Cache operations for get, put, and remove
//!
//! Reads verify that the stored entry really answers the request before
//! handing it out. Writes go through a one-shot `Edit` so a failure at any
//! point aborts the entry instead of leaving half of it behind.

use std::io::{self, Read};

use http::Method;

use super::super::cache_entry::CacheEntry;
use super::super::codec::CodecError;
use super::super::disk::{BODY_SLOT, Edit, EditError, METADATA_SLOT, Snapshot, read_slot};
use super::core::ResponseCache;
use crate::http::{Body, HttpRequest, HttpResponse, has_vary_all};

impl ResponseCache {
    /// Look up the stored response for `request`.
    ///
    /// The returned body streams from the store and holds its snapshot open
    /// until it is read to the end or dropped.
    pub fn get(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let store = self.store.as_ref()?;
        let key = self.key_for(request);

        let mut snapshot = match store.get(key.hash_key()) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    url = %key.canonical_url,
                    "Cache miss"
                );
                self.stats.record_miss();
                return None;
            }
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Failed to open cache entry"
                );
                self.stats.record_miss();
                return None;
            }
        };

        let entry = match self.read_entry(snapshot.as_mut()) {
            Ok(entry) => entry,
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Discarding unreadable cache entry"
                );
                self.stats.record_decode_error();
                self.stats.record_miss();
                return None;
            }
        };

        if !entry.matches(request, &self.stripped_params) {
            tracing::debug!(
                target: "stash::cache::response_cache",
                key = %key,
                stored_url = %entry.url,
                stored_method = %entry.request_method,
                "Stored entry does not match request"
            );
            self.stats.record_miss();
            return None;
        }

        let body = match snapshot.input_stream(BODY_SLOT) {
            Ok(reader) => Body::from_reader(SnapshotBody {
                reader,
                _snapshot: snapshot,
            }),
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Failed to open cached body"
                );
                self.stats.record_miss();
                return None;
            }
        };

        match entry.into_response(body) {
            Ok(response) => {
                tracing::debug!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    status = response.status_code().as_u16(),
                    "Cache hit"
                );
                self.stats.record_hit();
                Some(response)
            }
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Stored URL no longer parses"
                );
                self.stats.record_decode_error();
                self.stats.record_miss();
                None
            }
        }
    }

    fn read_entry(&self, snapshot: &mut dyn Snapshot) -> Result<CacheEntry, CodecError> {
        let metadata = read_slot(snapshot, METADATA_SLOT)?;
        self.codec.decode_slice(&metadata)
    }

    /// Store `response`, whose body must already be buffered.
    ///
    /// Only GET and POST responses are written, never one with `Vary: *`.
    /// Nothing is reported back: a write that cannot happen is skipped and a
    /// write that fails is aborted, both with a log line.
    pub fn put(&self, response: &HttpResponse) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let request = response.request();

        if !is_storable_method(request.method()) {
            self.skip_write(request, "method is not cacheable");
            return;
        }
        if has_vary_all(response.header_list()) {
            self.skip_write(request, "response varies on every header");
            return;
        }
        let Some(body) = response.body_ref().as_bytes() else {
            self.skip_write(request, "body is not buffered");
            return;
        };

        let entry = CacheEntry::from_response(response, &self.stripped_params);
        let metadata = match self.codec.encode_to_vec(&entry) {
            Ok(metadata) => metadata,
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    url = %entry.url,
                    error = %error,
                    "Response metadata is not encodable"
                );
                self.stats.record_write_skip();
                return;
            }
        };

        let key = self.key_for(request);
        let editor = match store.edit(key.hash_key()) {
            Ok(Some(editor)) => editor,
            Ok(None) => {
                self.skip_write(request, "entry is being written by another request");
                return;
            }
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Failed to open cache editor"
                );
                self.stats.record_write_skip();
                return;
            }
        };

        let mut edit = Edit::new(key.hash_key(), editor);
        match write_entry(&mut edit, &metadata, body) {
            Ok(()) => {
                tracing::debug!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    method = %request.method(),
                    url = %key.canonical_url,
                    bytes = body.len(),
                    "Stored response"
                );
                self.stats.record_write();
            }
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Cache write aborted"
                );
                self.stats.record_write_abort();
            }
        }
    }

    fn skip_write(&self, request: &HttpRequest, reason: &'static str) {
        tracing::debug!(
            target: "stash::cache::response_cache",
            method = %request.method(),
            url = %request.url(),
            reason,
            "Skipping cache write"
        );
        self.stats.record_write_skip();
    }

    /// Remove the stored response for `request`. Returns whether an entry
    /// was removed.
    pub fn remove(&self, request: &HttpRequest) -> bool {
        let Some(store) = self.store.as_ref() else {
            return false;
        };
        let key = self.key_for(request);
        match store.remove(key.hash_key()) {
            Ok(removed) => removed,
            Err(error) => {
                tracing::warn!(
                    target: "stash::cache::response_cache",
                    key = %key,
                    error = %error,
                    "Failed to remove cache entry"
                );
                false
            }
        }
    }
}

fn is_storable_method(method: &Method) -> bool {
    *method == Method::GET || *method == Method::POST
}

/// Writes both slots and commits. An error leaves the edit open, so dropping
/// it aborts.
fn write_entry(edit: &mut Edit, metadata: &[u8], body: &[u8]) -> Result<(), EditError> {
    edit.write_slot(METADATA_SLOT, metadata)?;
    edit.write_slot(BODY_SLOT, body)?;
    edit.commit()
}

/// Cached body stream that keeps its snapshot alive.
struct SnapshotBody {
    reader: Box<dyn Read + Send>,
    _snapshot: Box<dyn Snapshot>,
}

impl Read for SnapshotBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}
