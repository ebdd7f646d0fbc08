//! Index-file strategies
//!
//! The source representation of the catalog: one directory per version tag
//! under a patches root, each holding an index file.
//!
//! ```text
//! patches/
//!   1.1.0/index.json
//!   1.10.0/index.yaml
//! ```

use crate::error::{CatalogError, StrategyError};
use crate::strategy::ResolutionStrategy;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use upgrade_patch::{PatchIndex, PatchSet, VersionTag};

/// Index file encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexFormat {
    /// `index.json`
    Json,
    /// `index.yaml`
    Yaml,
}

impl IndexFormat {
    /// File name looked up inside each tag directory
    #[inline]
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Json => "index.json",
            Self::Yaml => "index.yaml",
        }
    }

    fn parse(self, raw: &str) -> Result<PatchIndex, String> {
        match self {
            Self::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        }
    }
}

/// Loads declarative patch sets from `<root>/<tag>/index.<ext>`
#[derive(Debug, Clone)]
pub struct IndexFileStrategy {
    root: PathBuf,
    project_root: PathBuf,
    format: IndexFormat,
}

impl IndexFileStrategy {
    /// Create strategy reading `format` index files under `root`, whose
    /// patches edit files under `project_root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, project_root: impl Into<PathBuf>, format: IndexFormat) -> Self {
        Self {
            root: root.into(),
            project_root: project_root.into(),
            format,
        }
    }

    /// JSON index strategy
    #[inline]
    #[must_use]
    pub fn json(root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self::new(root, project_root, IndexFormat::Json)
    }

    /// YAML index strategy
    #[inline]
    #[must_use]
    pub fn yaml(root: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        Self::new(root, project_root, IndexFormat::Yaml)
    }

    /// Patches root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn index_path(&self, tag: &VersionTag) -> PathBuf {
        self.root.join(tag.to_string()).join(self.format.file_name())
    }
}

#[async_trait]
impl ResolutionStrategy for IndexFileStrategy {
    fn name(&self) -> &'static str {
        match self.format {
            IndexFormat::Json => "json_index",
            IndexFormat::Yaml => "yaml_index",
        }
    }

    fn priority(&self) -> i32 {
        match self.format {
            IndexFormat::Json => 50,
            IndexFormat::Yaml => 10,
        }
    }

    async fn tags(&self) -> Result<Vec<String>, CatalogError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(root = %self.root.display(), "patches root missing");
                return Ok(Vec::new());
            }
            Err(e) => return Err(CatalogError::io_error(&self.root, e)),
        };

        let mut tags = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogError::io_error(&self.root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map_err(|e| CatalogError::io_error(entry.path(), e))?
                .is_dir();
            if is_dir {
                tags.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(tags)
    }

    async fn resolve(&self, tag: &VersionTag) -> Result<Option<PatchSet>, StrategyError> {
        let path = self.index_path(tag);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StrategyError::io_error(&path, e)),
        };

        let index = self
            .format
            .parse(&raw)
            .map_err(|message| StrategyError::malformed(&path, message))?;

        index
            .into_patch_set(&self.project_root)
            .map(Some)
            .map_err(|source| StrategyError::InvalidPatch { path, source })
    }
}
