//! TLS handshake summary stored with secure entries

use std::fmt;
use std::str::FromStr;

use super::certificate::Certificate;
use super::errors::CertificateError;

/// Negotiated protocol version, named as TLS stacks report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TlsVersion {
    Tls13,
    Tls12,
    Tls11,
    Tls10,
    Ssl30,
}

impl TlsVersion {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TlsVersion::Tls13 => "TLSv1.3",
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls11 => "TLSv1.1",
            TlsVersion::Tls10 => "TLSv1",
            TlsVersion::Ssl30 => "SSLv3",
        }
    }
}

impl FromStr for TlsVersion {
    type Err = CertificateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TLSv1.3" => Ok(TlsVersion::Tls13),
            "TLSv1.2" => Ok(TlsVersion::Tls12),
            "TLSv1.1" => Ok(TlsVersion::Tls11),
            "TLSv1" => Ok(TlsVersion::Tls10),
            "SSLv3" => Ok(TlsVersion::Ssl30),
            other => Err(CertificateError::UnknownTlsVersion(other.to_string())),
        }
    }
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the cache remembers about the TLS session that produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub cipher_suite: String,
    pub peer_certificates: Vec<Certificate>,
    pub local_certificates: Vec<Certificate>,
    /// Unknown for some transports and for entries written without it.
    pub tls_version: Option<TlsVersion>,
}

impl Handshake {
    #[must_use]
    pub fn new(cipher_suite: impl Into<String>) -> Self {
        Self {
            cipher_suite: cipher_suite.into(),
            peer_certificates: Vec::new(),
            local_certificates: Vec::new(),
            tls_version: None,
        }
    }

    #[must_use]
    pub fn peer_certificates(mut self, certificates: Vec<Certificate>) -> Self {
        self.peer_certificates = certificates;
        self
    }

    #[must_use]
    pub fn local_certificates(mut self, certificates: Vec<Certificate>) -> Self {
        self.local_certificates = certificates;
        self
    }

    #[must_use]
    pub fn tls_version(mut self, version: TlsVersion) -> Self {
        self.tls_version = Some(version);
        self
    }
}
