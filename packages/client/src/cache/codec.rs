//! Line-oriented encoding of cache entry metadata
//!
//! An entry is written as `\n` terminated UTF-8 lines:
//!
//! ```text
//! http://example.com/items?page=1
//! GET
//! 1
//! Accept-Language: fr-CA
//! HTTP/1.1 200 OK
//! 3
//! Content-Type: application/json
//! Stash-Sent-Millis: 1508245212000
//! Stash-Received-Millis: 1508245212450
//! ```
//!
//! Secure entries continue with a blank line, the cipher suite, the peer and
//! local certificate chains (a count, then one base64 DER certificate per
//! line, `-1` for an absent chain) and an optional TLS version line.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use http::{Method, StatusCode, Version};
use thiserror::Error;

use super::cache_entry::CacheEntry;
use crate::http::{HeaderError, Headers, is_secure};
use crate::tls::{Certificate, CertificateCodec, CertificateError, Handshake, TlsVersion, X509CertificateCodec};

/// Synthetic header recording when the request was sent.
pub const SENT_MILLIS_HEADER: &str = "Stash-Sent-Millis";
/// Synthetic header recording when the response was received.
pub const RECEIVED_MILLIS_HEADER: &str = "Stash-Received-Millis";

/// Failures reading or writing entry metadata.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected end of entry")]
    UnexpectedEof,
    #[error("entry line is not valid UTF-8")]
    InvalidUtf8,
    #[error("expected a count but was \"{0}\"")]
    InvalidCount(String),
    #[error("unexpected status line: {0}")]
    InvalidStatusLine(String),
    #[error(transparent)]
    InvalidHeader(#[from] HeaderError),
    #[error("expected a millisecond timestamp but was \"{0}\"")]
    InvalidMillis(String),
    #[error("expected \"\" but was \"{0}\"")]
    ExpectedBlankLine(String),
    #[error("invalid request method \"{0}\"")]
    InvalidMethod(String),
    #[error("invalid base64 certificate: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error("secure entry has no TLS handshake")]
    MissingHandshake,
    #[error("plain http entry carries a TLS handshake")]
    UnexpectedHandshake,
    #[error("{field} cannot be stored: {reason}")]
    Unencodable {
        field: String,
        reason: &'static str,
    },
}

/// Encodes and decodes [`CacheEntry`] metadata.
#[derive(Clone)]
pub struct EntryCodec {
    certificates: Arc<dyn CertificateCodec>,
}

impl Default for EntryCodec {
    fn default() -> Self {
        Self::new(Arc::new(X509CertificateCodec))
    }
}

impl std::fmt::Debug for EntryCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryCodec").finish_non_exhaustive()
    }
}

impl EntryCodec {
    #[must_use]
    pub fn new(certificates: Arc<dyn CertificateCodec>) -> Self {
        Self { certificates }
    }

    /// Writes `entry` to `out`.
    ///
    /// Every field is checked before anything is written: a value that would
    /// not read back identically is rejected. A secure entry needs a
    /// handshake and a plain entry must not carry one.
    pub fn encode<W: Write>(&self, entry: &CacheEntry, mut out: W) -> Result<(), CodecError> {
        validate(entry)?;

        writeln!(out, "{}", entry.url)?;
        writeln!(out, "{}", entry.request_method)?;
        writeln!(out, "{}", entry.vary_headers.len())?;
        write!(out, "{}", entry.vary_headers)?;

        writeln!(
            out,
            "{} {} {}",
            protocol_token(entry.protocol),
            entry.status_code.as_u16(),
            entry.status_message
        )?;
        writeln!(out, "{}", entry.response_headers.len() + 2)?;
        write!(out, "{}", entry.response_headers)?;
        writeln!(out, "{SENT_MILLIS_HEADER}: {}", entry.sent_at_millis)?;
        writeln!(out, "{RECEIVED_MILLIS_HEADER}: {}", entry.received_at_millis)?;

        if let Some(handshake) = &entry.handshake {
            writeln!(out)?;
            writeln!(out, "{}", handshake.cipher_suite)?;
            self.write_certificates(&mut out, &handshake.peer_certificates)?;
            self.write_certificates(&mut out, &handshake.local_certificates)?;
            if let Some(version) = handshake.tls_version {
                writeln!(out, "{version}")?;
            }
        }

        out.flush()?;
        Ok(())
    }

    /// Encodes into a fresh buffer.
    pub fn encode_to_vec(&self, entry: &CacheEntry) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::with_capacity(512);
        self.encode(entry, &mut buffer)?;
        Ok(buffer)
    }

    fn write_certificates<W: Write>(
        &self,
        out: &mut W,
        certificates: &[Certificate],
    ) -> Result<(), CodecError> {
        writeln!(out, "{}", certificates.len())?;
        for certificate in certificates {
            let der = self.certificates.encode(certificate)?;
            writeln!(out, "{}", STANDARD.encode(der))?;
        }
        Ok(())
    }

    /// Reads one entry from `input`.
    pub fn decode<R: BufRead>(&self, input: R) -> Result<CacheEntry, CodecError> {
        let mut lines = LineReader::new(input);

        let url = lines.required()?;
        let method_line = lines.required()?;
        let request_method = Method::from_bytes(method_line.as_bytes())
            .map_err(|_| CodecError::InvalidMethod(method_line.clone()))?;

        let vary_count = lines.count()?;
        let mut vary_headers = Headers::new();
        for _ in 0..vary_count {
            vary_headers.add_line(&lines.required()?)?;
        }

        let (protocol, status_code, status_message) = parse_status_line(&lines.required()?)?;

        let header_count = lines.count()?;
        let mut response_headers = Headers::new();
        for _ in 0..header_count {
            response_headers.add_line(&lines.required()?)?;
        }
        let sent_at_millis = take_millis(&mut response_headers, SENT_MILLIS_HEADER)?;
        let received_at_millis = take_millis(&mut response_headers, RECEIVED_MILLIS_HEADER)?;

        let handshake = if is_secure(&url) {
            let blank = lines.required()?;
            if !blank.is_empty() {
                return Err(CodecError::ExpectedBlankLine(blank));
            }
            let cipher_suite = lines.required()?;
            let peer_certificates = self.read_certificates(&mut lines)?;
            let local_certificates = self.read_certificates(&mut lines)?;

            let mut handshake = Handshake::new(cipher_suite)
                .peer_certificates(peer_certificates)
                .local_certificates(local_certificates);
            if let Some(version) = lines.optional()? {
                handshake = handshake.tls_version(version.parse::<TlsVersion>()?);
            }
            Some(handshake)
        } else {
            None
        };

        Ok(CacheEntry {
            url,
            request_method,
            vary_headers,
            protocol,
            status_code,
            status_message,
            response_headers,
            handshake,
            sent_at_millis,
            received_at_millis,
        })
    }

    /// Decodes from an in-memory buffer.
    pub fn decode_slice(&self, bytes: &[u8]) -> Result<CacheEntry, CodecError> {
        self.decode(bytes)
    }

    fn read_certificates<R: BufRead>(
        &self,
        lines: &mut LineReader<R>,
    ) -> Result<Vec<Certificate>, CodecError> {
        let line = lines.required()?;
        if line == "-1" {
            return Ok(Vec::new());
        }
        let count = parse_count(&line)?;

        let mut certificates = Vec::with_capacity(count.min(16));
        for _ in 0..count {
            let der = STANDARD.decode(lines.required()?.as_bytes())?;
            certificates.push(self.certificates.decode(&der)?);
        }
        Ok(certificates)
    }
}

/// Reads strictly `\n` terminated lines, tolerating a trailing `\r`.
struct LineReader<R> {
    input: R,
    buffer: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            buffer: Vec::with_capacity(128),
        }
    }

    fn required(&mut self) -> Result<String, CodecError> {
        self.optional()?.ok_or(CodecError::UnexpectedEof)
    }

    /// `None` only at a clean end of input. A final line without its
    /// terminator is still an error.
    fn optional(&mut self) -> Result<Option<String>, CodecError> {
        self.buffer.clear();
        let read = self.input.read_until(b'\n', &mut self.buffer)?;
        if read == 0 {
            return Ok(None);
        }
        if self.buffer.pop() != Some(b'\n') {
            return Err(CodecError::UnexpectedEof);
        }
        if self.buffer.last() == Some(&b'\r') {
            self.buffer.pop();
        }

        String::from_utf8(std::mem::take(&mut self.buffer))
            .map(Some)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    fn count(&mut self) -> Result<usize, CodecError> {
        parse_count(&self.required()?)
    }
}

fn validate(entry: &CacheEntry) -> Result<(), CodecError> {
    match (is_secure(&entry.url), &entry.handshake) {
        (true, None) => return Err(CodecError::MissingHandshake),
        (false, Some(_)) => return Err(CodecError::UnexpectedHandshake),
        _ => {}
    }

    check_line("url", &entry.url)?;
    if entry.url.is_empty() {
        return Err(unencodable("url", "empty"));
    }
    check_line("status message", &entry.status_message)?;

    check_headers(&entry.vary_headers)?;
    check_headers(&entry.response_headers)?;
    for synthetic in [SENT_MILLIS_HEADER, RECEIVED_MILLIS_HEADER] {
        if entry.response_headers.contains(synthetic) {
            return Err(unencodable(synthetic, "reserved header name"));
        }
    }

    if let Some(handshake) = &entry.handshake {
        check_line("cipher suite", &handshake.cipher_suite)?;
        if handshake.cipher_suite.is_empty() {
            return Err(unencodable("cipher suite", "empty"));
        }
    }
    Ok(())
}

fn check_headers(headers: &Headers) -> Result<(), CodecError> {
    for (name, value) in headers.iter() {
        check_line(name, name)?;
        check_line(name, value)?;
        if name.is_empty() {
            return Err(unencodable(name, "empty header name"));
        }
        if name.contains(':') {
            return Err(unencodable(name, "colon in header name"));
        }
        if name.trim() != name || value.trim() != value {
            return Err(unencodable(name, "surrounding whitespace"));
        }
    }
    Ok(())
}

fn check_line(field: &str, value: &str) -> Result<(), CodecError> {
    if value.contains(['\r', '\n']) {
        return Err(unencodable(field, "line break"));
    }
    Ok(())
}

fn unencodable(field: &str, reason: &'static str) -> CodecError {
    CodecError::Unencodable {
        field: field.to_string(),
        reason,
    }
}

fn parse_count(line: &str) -> Result<usize, CodecError> {
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::InvalidCount(line.to_string()));
    }
    line.parse::<usize>()
        .map_err(|_| CodecError::InvalidCount(line.to_string()))
}

fn take_millis(headers: &mut Headers, name: &str) -> Result<i64, CodecError> {
    let Some(value) = headers.get(name).map(str::to_string) else {
        return Ok(0);
    };
    headers.remove_all(name);
    value.parse::<i64>().map_err(|_| CodecError::InvalidMillis(value))
}

fn protocol_token(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == Version::HTTP_2 {
        "HTTP/2"
    } else if version == Version::HTTP_3 {
        "HTTP/3"
    } else {
        "HTTP/1.1"
    }
}

fn parse_protocol(token: &str) -> Option<Version> {
    match token {
        "HTTP/0.9" => Some(Version::HTTP_09),
        "HTTP/1.0" | "ICY" => Some(Version::HTTP_10),
        "HTTP/1.1" => Some(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Some(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Some(Version::HTTP_3),
        _ => None,
    }
}

/// Parses `PROTOCOL CODE [MESSAGE]`.
fn parse_status_line(line: &str) -> Result<(Version, StatusCode, String), CodecError> {
    let invalid = || CodecError::InvalidStatusLine(line.to_string());

    let (token, rest) = line.split_once(' ').ok_or_else(invalid)?;
    let protocol = parse_protocol(token).ok_or_else(invalid)?;

    let code = rest.get(..3).ok_or_else(invalid)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let status = code
        .parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(invalid)?;

    let message = match &rest[3..] {
        "" => String::new(),
        tail => tail.strip_prefix(' ').ok_or_else(invalid)?.to_string(),
    };

    Ok((protocol, status, message))
}
