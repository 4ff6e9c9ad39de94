//! TLS-specific error types

/// Failures encoding, decoding or naming TLS handshake material.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CertificateError {
    #[error("Certificate parsing failed: {0}")]
    Parsing(String),
    #[error("Certificate has {0} trailing bytes after the DER structure")]
    TrailingData(usize),
    #[error("Certificate encoding failed: {0}")]
    Encoding(String),
    #[error("Unknown TLS version: {0}")]
    UnknownTlsVersion(String),
}
