//! Declarative patches
//!
//! Patches described as data in a catalog index file rather than compiled
//! into the tool. Every action is check-then-act, so re-running a patch that
//! already took effect reports a skip instead of doing the work twice.
//!
//! ```json
//! {
//!   "patches": [
//!     { "description": "Pin Node.js 20", "action": "write_file",
//!       "path": ".nvmrc", "contents": "20\n" },
//!     { "description": "Enable strict mode", "action": "json_set",
//!       "path": "tsconfig.json", "key": "compilerOptions.strict", "value": true }
//!   ]
//! }
//! ```

use crate::error::PatchError;
use crate::patch::{Mode, Patch, PatchOutcome, PatchSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

const UP_TO_DATE: &str = "already up to date";
const FILE_NOT_FOUND: &str = "file not found";

/// Contents of a patch-set index file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchIndex {
    /// Patches in execution order
    pub patches: Vec<PatchSpec>,
}

impl PatchIndex {
    /// Bind every spec to a project root
    ///
    /// # Errors
    /// - `PatchError::InvalidPath` if any target escapes the project root
    pub fn into_patch_set(self, project_root: impl AsRef<Path>) -> Result<PatchSet, PatchError> {
        let project_root = project_root.as_ref();
        self.patches
            .into_iter()
            .map(|spec| {
                DeclarativePatch::new(spec, project_root).map(|p| Arc::new(p) as Arc<dyn Patch>)
            })
            .collect()
    }
}

/// One declarative patch entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchSpec {
    /// Human-readable label
    pub description: String,
    /// What the patch does
    #[serde(flatten)]
    pub action: PatchAction,
}

/// Supported declarative actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PatchAction {
    /// Ensure a file has exactly these contents
    WriteFile {
        /// Project-relative file
        path: PathBuf,
        /// Desired contents
        contents: String,
    },
    /// Remove a file if present
    DeleteFile {
        /// Project-relative file
        path: PathBuf,
    },
    /// Set a dot-separated key inside a JSON file
    JsonSet {
        /// Project-relative JSON file
        path: PathBuf,
        /// Dot-separated key, e.g. `engines.node`
        key: String,
        /// Value to store
        value: Value,
    },
}

impl PatchAction {
    /// Project-relative target path
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::WriteFile { path, .. } | Self::DeleteFile { path } | Self::JsonSet { path, .. } => {
                path
            }
        }
    }
}

/// A [`PatchSpec`] bound to the project it edits
#[derive(Debug, Clone)]
pub struct DeclarativePatch {
    spec: PatchSpec,
    target: PathBuf,
}

impl DeclarativePatch {
    /// Bind spec to project root
    ///
    /// # Errors
    /// - `PatchError::InvalidPath` for absolute paths or `..` components
    pub fn new(spec: PatchSpec, project_root: impl AsRef<Path>) -> Result<Self, PatchError> {
        let relative = spec.action.path();
        let escapes = relative.as_os_str().is_empty()
            || relative.components().any(|c| {
                matches!(
                    c,
                    Component::ParentDir | Component::RootDir | Component::Prefix(_)
                )
            });
        if escapes {
            return Err(PatchError::InvalidPath(relative.display().to_string()));
        }

        let target = project_root.as_ref().join(relative);
        Ok(Self { spec, target })
    }

    /// Absolute target path
    #[inline]
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Underlying spec
    #[inline]
    #[must_use]
    pub fn spec(&self) -> &PatchSpec {
        &self.spec
    }

    async fn write_file(&self, contents: &str, mode: Mode) -> Result<PatchOutcome, PatchError> {
        if read_optional(&self.target).await?.as_deref() == Some(contents) {
            return Ok(PatchOutcome::skip(UP_TO_DATE));
        }

        if mode.is_mutating() {
            if let Some(parent) = self.target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| PatchError::io_error(parent, e))?;
            }
            tokio::fs::write(&self.target, contents)
                .await
                .map_err(|e| PatchError::io_error(&self.target, e))?;
        }

        Ok(PatchOutcome::Apply)
    }

    async fn delete_file(&self, mode: Mode) -> Result<PatchOutcome, PatchError> {
        if !tokio::fs::try_exists(&self.target)
            .await
            .map_err(|e| PatchError::io_error(&self.target, e))?
        {
            return Ok(PatchOutcome::skip(FILE_NOT_FOUND));
        }

        if mode.is_mutating() {
            tokio::fs::remove_file(&self.target)
                .await
                .map_err(|e| PatchError::io_error(&self.target, e))?;
        }

        Ok(PatchOutcome::Apply)
    }

    async fn json_set(&self, key: &str, value: &Value, mode: Mode) -> Result<PatchOutcome, PatchError> {
        let Some(raw) = read_optional(&self.target).await? else {
            return Ok(PatchOutcome::skip(FILE_NOT_FOUND));
        };

        let mut root: Value =
            serde_json::from_str(&raw).map_err(|e| PatchError::json_error(&self.target, e))?;
        if get_path(&root, key) == Some(value) {
            return Ok(PatchOutcome::skip(UP_TO_DATE));
        }

        set_path(&mut root, key, value.clone())?;
        if mode.is_mutating() {
            let mut text = serde_json::to_string_pretty(&root)
                .map_err(|e| PatchError::json_error(&self.target, e))?;
            text.push('\n');
            tokio::fs::write(&self.target, text)
                .await
                .map_err(|e| PatchError::io_error(&self.target, e))?;
        }

        Ok(PatchOutcome::Apply)
    }
}

#[async_trait]
impl Patch for DeclarativePatch {
    fn description(&self) -> &str {
        &self.spec.description
    }

    async fn apply(&self, mode: Mode) -> Result<PatchOutcome, PatchError> {
        let outcome = match &self.spec.action {
            PatchAction::WriteFile { contents, .. } => self.write_file(contents, mode).await?,
            PatchAction::DeleteFile { .. } => self.delete_file(mode).await?,
            PatchAction::JsonSet { key, value, .. } => self.json_set(key, value, mode).await?,
        };
        tracing::debug!(
            path = %self.target.display(),
            %mode,
            skipped = outcome.is_skip(),
            "declarative patch evaluated"
        );
        Ok(outcome)
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>, PatchError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PatchError::io_error(path, e)),
    }
}

/// Get value at path (dot notation)
#[must_use]
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

/// Set value at path (dot notation)
///
/// Creates missing intermediate objects. Existing values are never replaced
/// by an object.
///
/// # Errors
/// - `PatchError::Failed` if the root or an intermediate value is not an object
pub fn set_path(root: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let segments: Vec<_> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Ok(());
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = match current {
            Value::Object(map) => map
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(serde_json::Map::new())),
            _ => return Err(not_an_object(path, &segments[..depth])),
        };
    }

    match current {
        Value::Object(map) => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        _ => Err(not_an_object(path, parents)),
    }
}

fn not_an_object(path: &str, parents: &[&str]) -> PatchError {
    let at = if parents.is_empty() {
        "the document root".to_string()
    } else {
        format!("'{}'", parents.join("."))
    };
    PatchError::failed(format!("cannot set '{path}': {at} is not an object"))
}
