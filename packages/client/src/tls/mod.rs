//! TLS handshake summaries
//!
//! Secure cache entries remember the cipher suite, both certificate chains and
//! the negotiated version of the session that produced them.

pub mod certificate;
pub mod errors;
pub mod handshake;

pub use certificate::{Certificate, CertificateCodec, CertificateInfo, X509CertificateCodec};
pub use errors::CertificateError;
pub use handshake::{Handshake, TlsVersion};
