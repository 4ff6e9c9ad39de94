//! Certificates carried in a handshake summary
//!
//! Certificates are kept as DER bytes. Turning them into bytes and back goes
//! through the `CertificateCodec` capability so the entry codec never depends
//! on a particular X.509 library.

pub mod parser;

use std::fmt;

pub use parser::{CertificateInfo, X509CertificateCodec};

use super::errors::CertificateError;

/// A DER-encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Wraps DER bytes without validating them. Use a `CertificateCodec` to
    /// validate untrusted input.
    #[must_use]
    pub fn from_der_unchecked(der: Vec<u8>) -> Self {
        Self { der }
    }

    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn into_der(self) -> Vec<u8> {
        self.der
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("der", &format!("{} bytes", self.der.len()))
            .finish()
    }
}

/// Converts certificates to their stored byte form and back.
pub trait CertificateCodec: Send + Sync {
    /// Bytes written to the cache for `certificate`.
    fn encode(&self, certificate: &Certificate) -> Result<Vec<u8>, CertificateError>;

    /// Rebuilds a certificate from stored bytes, rejecting anything that does
    /// not parse.
    fn decode(&self, bytes: &[u8]) -> Result<Certificate, CertificateError>;
}
