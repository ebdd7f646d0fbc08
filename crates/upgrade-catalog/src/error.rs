//! Error types for catalog resolution

use std::fmt;
use std::path::{Path, PathBuf};
use upgrade_patch::PatchError;

/// Why one strategy could not supply a tag's patch set
///
/// A strategy error is recoverable: the catalog moves on to the next
/// strategy in its chain.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// Index file exists but could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// Index file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Index file could not be parsed
    #[error("malformed index {path}: {message}")]
    Malformed {
        /// Index file
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// Index parsed but describes an invalid patch
    #[error("invalid patch in {path}: {source}")]
    InvalidPatch {
        /// Index file
        path: PathBuf,
        /// Why the patch was rejected
        #[source]
        source: PatchError,
    },
}

impl StrategyError {
    /// Create IO error for path
    pub fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create parse error for path
    pub fn malformed(path: impl AsRef<Path>, message: impl fmt::Display) -> Self {
        Self::Malformed {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
        }
    }
}

/// One strategy's failed attempt at resolving a tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionAttempt {
    /// Strategy name
    pub strategy: &'static str,
    /// Miss reason
    pub reason: String,
}

impl fmt::Display for ResolutionAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy, self.reason)
    }
}

/// Fatal catalog errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No strategy could load the patch set for a tag
    #[error("could not resolve patches for {tag} (tried: {})", format_attempts(.attempts))]
    PatchResolution {
        /// Tag being resolved
        tag: String,
        /// One entry per strategy, in chain order
        attempts: Vec<ResolutionAttempt>,
    },

    /// Two catalog entries name the same version up to build metadata
    #[error("version tags {first} and {second} have equal precedence")]
    AmbiguousTag {
        /// Entry seen first
        first: String,
        /// Conflicting entry
        second: String,
    },

    /// Enumerating the catalog failed
    #[error("io error listing {path}: {source}")]
    Io {
        /// Directory being listed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    /// Create IO error for path
    pub fn io_error(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Tag that failed to resolve, if this is a resolution error
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::PatchResolution { tag, .. } => Some(tag),
            Self::AmbiguousTag { .. } | Self::Io { .. } => None,
        }
    }
}

fn format_attempts(attempts: &[ResolutionAttempt]) -> String {
    if attempts.is_empty() {
        return "no strategies registered".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
