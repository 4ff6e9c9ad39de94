//! Response bodies
//!
//! A transport body can be consumed exactly once. Anything that needs to look
//! at a body and still hand it on reads it into a `Body::Buffered` and returns
//! that instead of touching the original stream again.

use std::fmt;
use std::io::{self, Cursor, Read};

use bytes::Bytes;

/// A response body that is either still on the wire (or on disk) or fully in memory.
pub enum Body {
    /// Single-read stream. Dropping it releases whatever backs it.
    Unread(Box<dyn Read + Send>),
    /// Fully buffered bytes; cheap to clone and re-read.
    Buffered(Bytes),
}

impl Body {
    #[must_use]
    pub fn empty() -> Self {
        Body::Buffered(Bytes::new())
    }

    pub fn from_reader<R: Read + Send + 'static>(reader: R) -> Self {
        Body::Unread(Box::new(reader))
    }

    #[must_use]
    pub fn is_buffered(&self) -> bool {
        matches!(self, Body::Buffered(_))
    }

    /// Buffered bytes, if the body has already been read.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Buffered(bytes) => Some(bytes),
            Body::Unread(_) => None,
        }
    }

    /// Reads the whole body. A buffered body is returned as-is.
    pub fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Unread(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Reads the whole body and returns a re-readable replacement.
    pub fn buffer(self) -> io::Result<Body> {
        self.into_bytes().map(Body::Buffered)
    }

    /// Reads the whole body as UTF-8 text, replacing invalid sequences.
    pub fn into_string(self) -> io::Result<String> {
        let bytes = self.into_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// A fresh reader over the body.
    #[must_use]
    pub fn into_reader(self) -> Box<dyn Read + Send> {
        match self {
            Body::Buffered(bytes) => Box::new(Cursor::new(bytes)),
            Body::Unread(reader) => reader,
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Buffered(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Buffered(Bytes::from(bytes))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Buffered(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Buffered(Bytes::from_static(text.as_bytes()))
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Unread(_) => f.debug_tuple("Unread").field(&"<stream>").finish(),
            Body::Buffered(bytes) => f
                .debug_tuple("Buffered")
                .field(&format!("{} bytes", bytes.len()))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_body_buffers_once() {
        let body = Body::from_reader(Cursor::new(b"hello".to_vec()));
        assert!(!body.is_buffered());

        let buffered = body.buffer().unwrap();
        assert!(buffered.is_buffered());
        assert_eq!(buffered.as_bytes().unwrap().as_ref(), b"hello");
    }

    #[test]
    fn test_into_string_is_lossy() {
        let body = Body::from(vec![b'o', b'k', 0xff]);
        assert_eq!(body.into_string().unwrap(), "ok\u{fffd}");
    }

    #[test]
    fn test_buffered_reader_rereads() {
        let body = Body::from("abc");
        let bytes = body.as_bytes().cloned().unwrap();
        let mut out = String::new();
        Body::Buffered(bytes).into_reader().read_to_string(&mut out).unwrap();
        assert_eq!(out, "abc");
    }
}
