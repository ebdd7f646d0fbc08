//! Migration results

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;
use upgrade_patch::PatchOutcome;

/// Location-bound advice attached to a fixable result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// File the advice refers to
    pub path: PathBuf,
    /// Human-readable advice
    pub message: String,
}

/// What happened to one patch during an apply run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchReport {
    /// Version tag the patch was resolved under
    pub version: String,
    /// Patch description
    pub description: String,
    /// Patch outcome
    #[serde(flatten)]
    pub outcome: PatchOutcome,
}

/// Outcome of one orchestrator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationResult {
    /// Already current, or nothing applicable
    UpToDate,
    /// Patches ran and the version record was advanced
    Applied {
        /// Per-patch outcomes in execution order
        reports: Vec<PatchReport>,
    },
    /// Check mode found pending patches
    Fixable {
        /// Exactly one annotation, at the manifest
        annotations: Vec<Annotation>,
    },
}

impl MigrationResult {
    /// Whether the project passes
    #[inline]
    #[must_use]
    pub fn ok(&self) -> bool {
        !matches!(self, Self::Fixable { .. })
    }

    /// Whether an apply run would fix the project
    #[inline]
    #[must_use]
    pub fn fixable(&self) -> bool {
        matches!(self, Self::Fixable { .. })
    }

    /// Annotations (empty unless fixable)
    #[must_use]
    pub fn annotations(&self) -> &[Annotation] {
        match self {
            Self::Fixable { annotations } => annotations,
            _ => &[],
        }
    }

    /// Per-patch reports (empty unless applied)
    #[must_use]
    pub fn reports(&self) -> &[PatchReport] {
        match self {
            Self::Applied { reports } => reports,
            _ => &[],
        }
    }
}

/// Serializes to the lint-result shape `{ ok, fixable, annotations? }`
impl Serialize for MigrationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let annotations = self.annotations();
        let fields = if annotations.is_empty() { 2 } else { 3 };
        let mut state = serializer.serialize_struct("MigrationResult", fields)?;
        state.serialize_field("ok", &self.ok())?;
        state.serialize_field("fixable", &self.fixable())?;
        if annotations.is_empty() {
            state.skip_field("annotations")?;
        } else {
            state.serialize_field("annotations", annotations)?;
        }
        state.end()
    }
}
