use crate::cache::codec::CodecError;
use crate::cache::disk::EditError;
use crate::cache::cache_config::ConfigError;
use crate::tls::CertificateError;

use super::types::{Error, Kind};

impl From<CodecError> for Error {
    fn from(error: CodecError) -> Self {
        Error::new(Kind::Decode).with(error)
    }
}

impl From<CertificateError> for Error {
    fn from(error: CertificateError) -> Self {
        Error::new(Kind::Decode).with(error)
    }
}

impl From<EditError> for Error {
    fn from(error: EditError) -> Self {
        Error::new(Kind::Store).with(error)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self {
        Error::new(Kind::Builder).with(error)
    }
}
