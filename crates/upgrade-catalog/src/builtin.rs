//! Compiled-in patch registry

use crate::error::{CatalogError, StrategyError};
use crate::strategy::ResolutionStrategy;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use upgrade_patch::{Patch, PatchSet, VersionTag};

/// Patches compiled into the tool, keyed by version tag
///
/// This is the pre-built representation and is preferred over index files.
#[derive(Debug, Default, Clone)]
pub struct BuiltinStrategy {
    patches: BTreeMap<VersionTag, PatchSet>,
}

impl BuiltinStrategy {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            patches: BTreeMap::new(),
        }
    }

    /// Register a patch under a tag, after any patches already there
    pub fn register(&mut self, tag: VersionTag, patch: Arc<dyn Patch>) {
        self.patches.entry(tag).or_default().push(patch);
    }

    /// Builder form of [`register`](Self::register)
    #[inline]
    #[must_use]
    pub fn with_patch(mut self, tag: VersionTag, patch: Arc<dyn Patch>) -> Self {
        self.register(tag, patch);
        self
    }

    /// Number of registered patches across all tags
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.values().map(Vec::len).sum()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

#[async_trait]
impl ResolutionStrategy for BuiltinStrategy {
    fn name(&self) -> &'static str {
        "builtin"
    }

    fn priority(&self) -> i32 {
        100
    }

    async fn tags(&self) -> Result<Vec<String>, CatalogError> {
        Ok(self.patches.keys().map(ToString::to_string).collect())
    }

    async fn resolve(&self, tag: &VersionTag) -> Result<Option<PatchSet>, StrategyError> {
        Ok(self.patches.get(tag).cloned())
    }
}
