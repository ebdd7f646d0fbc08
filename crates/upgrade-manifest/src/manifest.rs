//! Consumer manifest and its version record
//!
//! The record lives at `<key>.version` in `package.json`:
//!
//! ```json
//! { "name": "my-service", "skuba": { "version": "7.1.0" } }
//! ```

use crate::error::ManifestError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Component, Path, PathBuf};
use upgrade_patch::Version;

const MANIFEST_FILE: &str = "package.json";

/// The consumer project's manifest, owned for the duration of one run
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest {
    /// Location of the manifest file
    pub path: PathBuf,
    /// Parsed contents, key order preserved
    pub package_json: Value,
}

impl Manifest {
    /// Create manifest from parsed contents
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, package_json: Value) -> Self {
        Self {
            path: path.into(),
            package_json,
        }
    }

    /// Parse manifest text
    ///
    /// # Errors
    /// - `ManifestError::Parse` if `raw` is not valid JSON
    pub fn parse(path: impl Into<PathBuf>, raw: &str) -> Result<Self, ManifestError> {
        let path = path.into();
        let package_json =
            serde_json::from_str(raw).map_err(|source| ManifestError::Parse {
                path: path.clone(),
                source,
            })?;
        Ok(Self { path, package_json })
    }

    /// Directory containing the manifest
    #[must_use]
    pub fn project_dir(&self) -> &Path {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Recorded version string under `key`, if any
    #[must_use]
    pub fn recorded_version(&self, key: &str) -> Option<&str> {
        self.package_json.get(key)?.get("version")?.as_str()
    }

    /// Top-level `packageManager` field (`"pnpm@8.15.0"`), if any
    #[must_use]
    pub fn package_manager_field(&self) -> Option<&str> {
        self.package_json.get("packageManager")?.as_str()
    }

    /// Return the recorded version, first initializing it to `default` when
    /// the manifest carries none
    ///
    /// An absent record and an explicit `default` are indistinguishable
    /// afterwards.
    ///
    /// # Errors
    /// - `ManifestError::InvalidRecord` if the manifest or the record is not
    ///   an object, or the version is not a string
    pub fn ensure_version_record(
        &mut self,
        key: &str,
        default: &str,
    ) -> Result<String, ManifestError> {
        let record = record_mut(&mut self.package_json, key)?;
        match record.get("version") {
            None | Some(Value::Null) => {
                tracing::debug!(key, default, "initializing missing version record");
                record.insert("version".to_string(), Value::String(default.to_string()));
                Ok(default.to_string())
            }
            Some(Value::String(version)) => Ok(version.clone()),
            Some(other) => Err(ManifestError::invalid_record(
                key,
                format!("expected version string, found {other}"),
            )),
        }
    }

    /// Overwrite the recorded version
    ///
    /// # Errors
    /// - `ManifestError::InvalidRecord` if the manifest or the record is not
    ///   an object
    pub fn set_recorded_version(&mut self, key: &str, version: &Version) -> Result<(), ManifestError> {
        record_mut(&mut self.package_json, key)?
            .insert("version".to_string(), Value::String(version.to_string()));
        Ok(())
    }
}

fn record_mut<'a>(root: &'a mut Value, key: &str) -> Result<&'a mut Map<String, Value>, ManifestError> {
    let Value::Object(root) = root else {
        return Err(ManifestError::invalid_record(key, "manifest is not a JSON object"));
    };

    let record = root.entry(key.to_string()).or_insert(Value::Null);
    if record.is_null() {
        *record = Value::Object(Map::new());
    }

    match record {
        Value::Object(map) => Ok(map),
        other => Err(ManifestError::invalid_record(
            key,
            format!("expected an object, found {other}"),
        )),
    }
}

/// Locates and reads the consumer manifest
#[async_trait]
pub trait ManifestProvider: Send + Sync {
    /// The project's manifest, or `None` when there is none
    async fn manifest(&self) -> Result<Option<Manifest>, ManifestError>;
}

/// Finds the nearest `package.json` at or above a start directory
///
/// A relative start is resolved against the working directory before the
/// search, so `.` still reaches parent directories. An optional ceiling
/// bounds the search: it is the last directory inspected.
#[derive(Debug, Clone)]
pub struct FsManifestProvider {
    start: PathBuf,
    ceiling: Option<PathBuf>,
}

impl FsManifestProvider {
    /// Create provider searching upwards from `start`
    #[inline]
    #[must_use]
    pub fn new(start: impl Into<PathBuf>) -> Self {
        Self {
            start: start.into(),
            ceiling: None,
        }
    }

    /// Stop the search at `ceiling` instead of the filesystem root
    #[inline]
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: impl Into<PathBuf>) -> Self {
        self.ceiling = Some(ceiling.into());
        self
    }

    /// Search start directory
    #[inline]
    #[must_use]
    pub fn start(&self) -> &Path {
        &self.start
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically
fn absolute(path: &Path) -> Result<PathBuf, ManifestError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| ManifestError::io_error(path, e))?;
        cwd.join(path)
    };

    let mut resolved = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => resolved.push(other),
        }
    }
    Ok(resolved)
}

#[async_trait]
impl ManifestProvider for FsManifestProvider {
    async fn manifest(&self) -> Result<Option<Manifest>, ManifestError> {
        let start = absolute(&self.start)?;
        let ceiling = self.ceiling.as_deref().map(absolute).transpose()?;

        for dir in start.ancestors() {
            let candidate = dir.join(MANIFEST_FILE);
            let exists = tokio::fs::try_exists(&candidate)
                .await
                .map_err(|e| ManifestError::io_error(&candidate, e))?;
            if exists {
                let raw = tokio::fs::read_to_string(&candidate)
                    .await
                    .map_err(|e| ManifestError::io_error(&candidate, e))?;
                tracing::debug!(path = %candidate.display(), "found manifest");
                return Manifest::parse(candidate, &raw).map(Some);
            }
            if ceiling.as_deref() == Some(dir) {
                break;
            }
        }

        tracing::debug!(start = %start.display(), "no manifest found");
        Ok(None)
    }
}
