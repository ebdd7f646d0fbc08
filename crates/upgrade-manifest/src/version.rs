//! Tool version source

use crate::error::ManifestError;
use async_trait::async_trait;
use upgrade_patch::{parse_version, Version};

/// Supplies the running tool's own version (the upgrade target)
#[async_trait]
pub trait VersionProvider: Send + Sync {
    /// Current tool version
    async fn current_version(&self) -> Result<Version, ManifestError>;
}

/// A version fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticVersionProvider {
    version: Version,
}

impl StaticVersionProvider {
    /// Wrap an already-parsed version
    #[inline]
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    /// Parse a version string
    ///
    /// # Errors
    /// - `ManifestError::InvalidVersion` if `raw` is not a semantic version
    pub fn parse(raw: &str) -> Result<Self, ManifestError> {
        parse_version(raw)
            .map(Self::new)
            .map_err(|source| ManifestError::InvalidVersion {
                value: raw.to_string(),
                source,
            })
    }
}

#[async_trait]
impl VersionProvider for StaticVersionProvider {
    async fn current_version(&self) -> Result<Version, ManifestError> {
        Ok(self.version.clone())
    }
}
