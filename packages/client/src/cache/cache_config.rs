//! Cache configuration and preset policies
//!
//! Provides `CacheConfig` for configuring where entries live on disk, how
//! large the store may grow and which query parameters never reach a key.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::ACCESS_TOKEN_PARAM;

/// Format version written by this build. Bumping it discards every stored
/// entry on the next open.
pub const DEFAULT_FORMAT_VERSION: u32 = 201_708;

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cache directory is empty")]
    EmptyDirectory,
    #[error("maximum cache size must be greater than zero")]
    ZeroMaxSize,
    #[error("format version must be greater than zero")]
    ZeroFormatVersion,
    #[error("stripped query parameter names must not be empty")]
    EmptyStrippedParam,
}

/// Disk cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding the store; created on open
    pub directory: PathBuf,
    /// Entries written under another version are discarded on open
    pub format_version: u32,
    /// LRU eviction keeps the store at or below this many bytes
    pub max_size_bytes: u64,
    /// Query parameters removed from URLs before keying and storing
    pub stripped_query_params: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: std::env::temp_dir().join("stash-cache"),
            format_version: DEFAULT_FORMAT_VERSION,
            max_size_bytes: 20 * 1024 * 1024, // 20MB
            stripped_query_params: vec![ACCESS_TOKEN_PARAM.to_string()],
        }
    }
}

impl CacheConfig {
    /// Default configuration rooted at `directory`
    #[must_use]
    pub fn in_directory(directory: impl AsRef<Path>) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Create conservative caching configuration
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_size_bytes: 5 * 1024 * 1024, // 5MB
            ..Self::default()
        }
    }

    /// Create generous caching configuration
    #[must_use]
    pub fn generous() -> Self {
        Self {
            max_size_bytes: 200 * 1024 * 1024, // 200MB
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDirectory);
        }
        if self.max_size_bytes == 0 {
            return Err(ConfigError::ZeroMaxSize);
        }
        if self.format_version == 0 {
            return Err(ConfigError::ZeroFormatVersion);
        }
        if self.stripped_query_params.iter().any(String::is_empty) {
            return Err(ConfigError::EmptyStrippedParam);
        }
        Ok(())
    }
}
