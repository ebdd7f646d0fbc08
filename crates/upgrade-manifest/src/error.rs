//! Error types for manifest access

use std::path::{Path, PathBuf};

/// Errors reading, interpreting or writing the consumer manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// IO error on the manifest file
    #[error("io error on {path}: {source}")]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid JSON
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Manifest path
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// Manifest could not be rendered back to text
    #[error("failed to format manifest: {0}")]
    Format(#[source] serde_json::Error),

    /// The version record is present but not shaped as expected
    #[error("invalid version record under '{key}': {message}")]
    InvalidRecord {
        /// Manifest key holding the record
        key: String,
        /// What is wrong with it
        message: String,
    },

    /// Tool version could not be determined
    #[error("invalid tool version '{value}': {source}")]
    InvalidVersion {
        /// Rejected input
        value: String,
        /// Parser error
        #[source]
        source: semver::Error,
    },
}

impl ManifestError {
    /// Create IO error for path
    pub fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create invalid record error
    pub fn invalid_record(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            key: key.into(),
            message: message.into(),
        }
    }
}
