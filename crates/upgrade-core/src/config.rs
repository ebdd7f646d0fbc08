//! Orchestrator configuration
//!
//! Loadable from TOML; every field has a default so a partial file is fine:
//!
//! ```toml
//! tool_name = "skuba"
//! tool_version = "7.2.0"
//! manifest_key = "skuba"
//! patches_dir = "patches"
//! ```
//!
//! A relative `patches_dir` read from a file is relative to that file.

use crate::error::UpgradeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use upgrade_patch::{parse_version, Version};

/// Orchestrator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    /// Tool name used in log lines and the annotation message
    pub tool_name: String,
    /// Subcommand that runs the patches, quoted in the check-mode hint
    pub apply_command: String,
    /// Version projects are upgraded to
    pub tool_version: Option<String>,
    /// Manifest key holding the `{ "version": ... }` record
    pub manifest_key: String,
    /// Recorded version assumed when the manifest has none
    pub default_version: String,
    /// Root of the directory-per-tag patch catalog
    pub patches_dir: Option<PathBuf>,
    /// Manifest indent width in spaces
    pub indent: usize,
}

impl UpgradeConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML configuration
    ///
    /// # Errors
    /// - `UpgradeError::Config` on malformed TOML or invalid values
    pub fn from_toml_str(raw: &str) -> Result<Self, UpgradeError> {
        let config: Self = toml::from_str(raw).map_err(|e| UpgradeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read TOML configuration from a file
    ///
    /// # Errors
    /// - `UpgradeError::Config` if the file cannot be read or parsed
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, UpgradeError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UpgradeError::Config(format!("reading {}: {e}", path.display())))?;
        let mut config = Self::from_toml_str(&raw)?;
        if let (Some(dir), Some(base)) = (&config.patches_dir, path.parent()) {
            if dir.is_relative() {
                config.patches_dir = Some(base.join(dir));
            }
        }
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Check values that serde cannot
    ///
    /// # Errors
    /// - `UpgradeError::Config` for an empty `manifest_key` or `tool_name`
    /// - `UpgradeError::InvalidVersion` for an unparsable `default_version`
    ///   or `tool_version`
    pub fn validate(&self) -> Result<(), UpgradeError> {
        if self.manifest_key.trim().is_empty() {
            return Err(UpgradeError::Config("manifest_key must not be empty".to_string()));
        }
        if self.tool_name.trim().is_empty() {
            return Err(UpgradeError::Config("tool_name must not be empty".to_string()));
        }
        if self.tool_version.is_some() {
            self.tool_version()?;
        }
        self.default_version().map(|_| ())
    }

    /// Parsed target version
    ///
    /// # Errors
    /// - `UpgradeError::Config` if no tool version is configured
    /// - `UpgradeError::InvalidVersion` if it does not parse
    pub fn tool_version(&self) -> Result<Version, UpgradeError> {
        let raw = self
            .tool_version
            .as_deref()
            .ok_or_else(|| UpgradeError::Config("no tool version configured".to_string()))?;
        parse_version(raw).map_err(|e| UpgradeError::invalid_version("tool version", raw, e))
    }

    /// Parsed default version
    ///
    /// # Errors
    /// - `UpgradeError::InvalidVersion` if `default_version` does not parse
    pub fn default_version(&self) -> Result<Version, UpgradeError> {
        parse_version(&self.default_version)
            .map_err(|e| UpgradeError::invalid_version("default version", &self.default_version, e))
    }

    /// With tool name
    #[inline]
    #[must_use]
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = name.into();
        self
    }

    /// With apply subcommand
    #[inline]
    #[must_use]
    pub fn with_apply_command(mut self, command: impl Into<String>) -> Self {
        self.apply_command = command.into();
        self
    }

    /// With target version
    #[inline]
    #[must_use]
    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = Some(version.into());
        self
    }

    /// With manifest key
    #[inline]
    #[must_use]
    pub fn with_manifest_key(mut self, key: impl Into<String>) -> Self {
        self.manifest_key = key.into();
        self
    }

    /// With patches directory
    #[inline]
    #[must_use]
    pub fn with_patches_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.patches_dir = Some(dir.into());
        self
    }

    /// With default version
    #[inline]
    #[must_use]
    pub fn with_default_version(mut self, version: impl Into<String>) -> Self {
        self.default_version = version.into();
        self
    }
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            tool_name: "skuba".to_string(),
            apply_command: "format".to_string(),
            tool_version: None,
            manifest_key: "skuba".to_string(),
            default_version: "1.0.0".to_string(),
            patches_dir: None,
            indent: 2,
        }
    }
}
