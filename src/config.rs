//! Scan configuration.
//!
//! Loaded from JSON; every key is optional and falls back to its default.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ingest::{ParseOptions, MAX_FILE_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    /// Bytes read per file; the rest is ignored
    pub max_file_size: usize,
    /// Per-file parse timeout, none by default
    pub parse_timeout_ms: Option<u64>,
    /// Parse files on the rayon pool
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            parse_timeout_ms: None,
            parallel: false,
        }
    }
}

impl ScanConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_file_size: self.max_file_size,
            timeout_ms: self.parse_timeout_ms,
        }
    }
}
