//! Patch unit contract

use crate::error::PatchError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Execution mode shared by the orchestrator and every patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Read-only inspection: report whether the patch would do anything
    Check,
    /// Materialize the patch's effect
    Apply,
}

impl Mode {
    /// Whether this mode may mutate the project
    #[inline]
    #[must_use]
    pub fn is_mutating(self) -> bool {
        matches!(self, Self::Apply)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Check => f.write_str("check"),
            Self::Apply => f.write_str("apply"),
        }
    }
}

/// Result of invoking a patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PatchOutcome {
    /// The effect was (or in check mode, would be) materialized
    Apply,
    /// The patch does not apply to this project
    Skip {
        /// Why it does not apply, when known
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl PatchOutcome {
    /// Skip with a diagnostic reason
    #[inline]
    #[must_use]
    pub fn skip(reason: impl Into<String>) -> Self {
        Self::Skip {
            reason: Some(reason.into()),
        }
    }

    /// Skip without a reason
    #[inline]
    #[must_use]
    pub fn skipped() -> Self {
        Self::Skip { reason: None }
    }

    /// Whether this outcome is a skip
    #[inline]
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    /// Skip reason, if any
    #[inline]
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Skip { reason } => reason.as_deref(),
            Self::Apply => None,
        }
    }
}

/// One self-contained upgrade step
///
/// Implementations must be idempotent or check-then-act: a run that fails
/// part-way is re-run from the same recorded version, so patches that already
/// succeeded are invoked again. In [`Mode::Check`] a patch must not mutate
/// anything, since check-mode invocations run concurrently.
#[async_trait]
pub trait Patch: Send + Sync + fmt::Debug {
    /// Human-readable label
    fn description(&self) -> &str;

    /// Run the step in the given mode
    async fn apply(&self, mode: Mode) -> Result<PatchOutcome, PatchError>;
}

/// Patches registered under one version tag, in catalog order
pub type PatchSet = Vec<Arc<dyn Patch>>;
