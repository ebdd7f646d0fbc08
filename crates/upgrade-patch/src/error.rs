//! Error types for patch execution

use std::path::{Path, PathBuf};

/// Errors raised while running a patch
///
/// These are never caught by the orchestrator: a failing patch aborts the run
/// before the version record is persisted.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// IO failure on a project file
    #[error("io error on {path}: {source}")]
    Io {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A project JSON file could not be parsed or encoded
    #[error("invalid json in {path}: {source}")]
    Json {
        /// File being decoded or encoded
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// Patch target escapes the project root
    #[error("invalid patch target path: {0}")]
    InvalidPath(String),

    /// Patch-specific failure
    #[error("patch failed: {0}")]
    Failed(String),
}

impl PatchError {
    /// Create IO error for path
    pub fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create JSON error for path
    pub fn json_error(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a generic failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_display() {
        let err = PatchError::failed("boom");
        assert_eq!(err.to_string(), "patch failed: boom");
    }

    #[test]
    fn io_error_keeps_path() {
        let err = PatchError::io_error(
            "a/b.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("a/b.json"));
        assert!(matches!(err, PatchError::Io { .. }));
    }
}
