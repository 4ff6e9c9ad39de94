//! X.509 certificate codec backed by `x509-parser`

use x509_parser::parse_x509_certificate;

use super::{Certificate, CertificateCodec};
use crate::tls::errors::CertificateError;

/// Default certificate capability: DER in, DER out, validated by parsing.
#[derive(Debug, Clone, Copy, Default)]
pub struct X509CertificateCodec;

/// A few identifying fields of a parsed certificate, for logs and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateInfo {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
}

impl X509CertificateCodec {
    /// Parses `der` and reports its subject, issuer and serial number.
    pub fn inspect(der: &[u8]) -> Result<CertificateInfo, CertificateError> {
        let (rest, cert) =
            parse_x509_certificate(der).map_err(|e| CertificateError::Parsing(e.to_string()))?;
        if !rest.is_empty() {
            return Err(CertificateError::TrailingData(rest.len()));
        }

        Ok(CertificateInfo {
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial: cert.raw_serial_as_string(),
        })
    }
}

impl CertificateCodec for X509CertificateCodec {
    fn encode(&self, certificate: &Certificate) -> Result<Vec<u8>, CertificateError> {
        if certificate.der().is_empty() {
            return Err(CertificateError::Encoding("empty certificate".to_string()));
        }
        Ok(certificate.der().to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Certificate, CertificateError> {
        Self::inspect(bytes)?;
        Ok(Certificate::from_der_unchecked(bytes.to_vec()))
    }
}
