//! One-shot edit completion
//!
//! An `Edit` owns an open `Editor` and moves through `Open` to exactly one of
//! `Committed` or `Aborted`. Completing twice is a caller bug: it fails with
//! [`EditError::AlreadyCompleted`] and trips a debug assertion. Dropping an
//! edit that is still open aborts it.

use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use super::Editor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Open,
    Committed,
    Aborted,
}

impl fmt::Display for EditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EditState::Open => "open",
            EditState::Committed => "committed",
            EditState::Aborted => "aborted",
        })
    }
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("edit for {key} already {state}")]
    AlreadyCompleted { key: String, state: EditState },
    #[error("edit for {key} failed: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Guarded editor for a single cache key.
pub struct Edit {
    key: String,
    editor: Option<Box<dyn Editor>>,
    state: EditState,
}

impl Edit {
    #[must_use]
    pub fn new(key: impl Into<String>, editor: Box<dyn Editor>) -> Self {
        Self {
            key: key.into(),
            editor: Some(editor),
            state: EditState::Open,
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn state(&self) -> EditState {
        self.state
    }

    /// Replaces the contents of `slot` with `bytes`.
    pub fn write_slot(&mut self, slot: usize, bytes: &[u8]) -> Result<(), EditError> {
        let key = self.key.clone();
        let mut stream = self.output_stream(slot)?;
        let written = stream.write_all(bytes).and_then(|()| stream.flush());
        drop(stream);
        written.map_err(|source| EditError::Io { key, source })
    }

    /// Opens a stream for `slot` on the underlying editor.
    pub fn output_stream(&mut self, slot: usize) -> Result<Box<dyn Write + Send + '_>, EditError> {
        let key = &self.key;
        let Some(editor) = self.editor.as_mut() else {
            return Err(EditError::AlreadyCompleted {
                key: key.clone(),
                state: self.state,
            });
        };
        editor.new_output_stream(slot).map_err(|source| EditError::Io {
            key: key.clone(),
            source,
        })
    }

    pub fn commit(&mut self) -> Result<(), EditError> {
        let editor = self.complete()?;
        match editor.commit() {
            Ok(()) => {
                self.state = EditState::Committed;
                Ok(())
            }
            Err(source) => {
                self.state = EditState::Aborted;
                Err(EditError::Io {
                    key: self.key.clone(),
                    source,
                })
            }
        }
    }

    pub fn abort(&mut self) -> Result<(), EditError> {
        let editor = self.complete()?;
        self.state = EditState::Aborted;
        editor.abort().map_err(|source| EditError::Io {
            key: self.key.clone(),
            source,
        })
    }

    fn complete(&mut self) -> Result<Box<dyn Editor>, EditError> {
        match self.editor.take() {
            Some(editor) if self.state == EditState::Open => Ok(editor),
            other => {
                self.editor = other;
                debug_assert!(false, "edit for {} completed twice", self.key);
                Err(EditError::AlreadyCompleted {
                    key: self.key.clone(),
                    state: self.state,
                })
            }
        }
    }
}

impl Drop for Edit {
    fn drop(&mut self) {
        if self.state != EditState::Open {
            return;
        }
        if let Some(editor) = self.editor.take() {
            self.state = EditState::Aborted;
            if let Err(error) = editor.abort() {
                tracing::debug!(
                    target: "stash::cache::disk",
                    key = %self.key,
                    error = %error,
                    "Abort of abandoned edit failed"
                );
            }
        }
    }
}

impl fmt::Debug for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edit")
            .field("key", &self.key)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[derive(Default)]
    struct Log(Mutex<Vec<&'static str>>);

    struct RecordingEditor {
        log: Arc<Log>,
        slot: Vec<u8>,
    }

    impl Editor for RecordingEditor {
        fn new_output_stream(&mut self, _slot: usize) -> io::Result<Box<dyn Write + Send + '_>> {
            self.slot.clear();
            Ok(Box::new(&mut self.slot))
        }

        fn commit(self: Box<Self>) -> io::Result<()> {
            self.log.0.lock().unwrap().push("commit");
            Ok(())
        }

        fn abort(self: Box<Self>) -> io::Result<()> {
            self.log.0.lock().unwrap().push("abort");
            Ok(())
        }
    }

    fn edit(log: &Arc<Log>) -> Edit {
        Edit::new(
            "k",
            Box::new(RecordingEditor {
                log: Arc::clone(log),
                slot: Vec::new(),
            }),
        )
    }

    #[test]
    fn test_commit_transitions_once() {
        let log = Arc::new(Log::default());
        let mut e = edit(&log);
        e.write_slot(0, b"meta").unwrap();
        e.commit().unwrap();
        assert_eq!(e.state(), EditState::Committed);
        drop(e);
        assert_eq!(*log.0.lock().unwrap(), vec!["commit"]);
    }

    #[test]
    fn test_drop_aborts_open_edit() {
        let log = Arc::new(Log::default());
        drop(edit(&log));
        assert_eq!(*log.0.lock().unwrap(), vec!["abort"]);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "completed twice")]
    fn test_second_completion_asserts() {
        let log = Arc::new(Log::default());
        let mut e = edit(&log);
        e.abort().unwrap();
        let _ = e.commit();
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_second_completion_is_an_error() {
        let log = Arc::new(Log::default());
        let mut e = edit(&log);
        e.abort().unwrap();
        assert!(matches!(
            e.commit(),
            Err(EditError::AlreadyCompleted {
                state: EditState::Aborted,
                ..
            })
        ));
        assert!(e.write_slot(0, b"late").is_err());
    }
}
