//! Error types for the migration orchestrator
//!
//! Every variant is fatal to the run. None of them is raised after the
//! manifest has been written, so a failed run can simply be repeated.

use upgrade_catalog::CatalogError;
use upgrade_manifest::ManifestError;
use upgrade_patch::PatchError;

/// Main orchestrator error type
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// No project manifest could be located
    #[error("could not find a package.json for this project")]
    ManifestNotFound,

    /// A version tag's patches could not be loaded
    #[error("patch resolution failed: {0}")]
    PatchResolution(#[from] CatalogError),

    /// A patch failed while running; passed through untouched
    #[error(transparent)]
    PatchExecution(#[from] PatchError),

    /// Manifest access failed
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Recorded or default version is not a semantic version
    #[error("invalid {field} '{value}': {source}")]
    InvalidVersion {
        /// Which version was being read
        field: &'static str,
        /// Rejected input
        value: String,
        /// Parser error
        #[source]
        source: semver::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl UpgradeError {
    /// Check if a patch failed (as opposed to the engine itself)
    #[inline]
    #[must_use]
    pub fn is_patch_failure(&self) -> bool {
        matches!(self, Self::PatchExecution(_))
    }

    /// Recover the patch's own error
    #[must_use]
    pub fn into_patch_error(self) -> Option<PatchError> {
        match self {
            Self::PatchExecution(e) => Some(e),
            _ => None,
        }
    }

    /// Create invalid version error
    pub fn invalid_version(field: &'static str, value: impl Into<String>, source: semver::Error) -> Self {
        Self::InvalidVersion {
            field,
            value: value.into(),
            source,
        }
    }
}
