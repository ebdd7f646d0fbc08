//! Resolution strategy trait
//!
//! A tag's patch set may exist in more than one physical representation.
//! Each representation is a [`ResolutionStrategy`]; the catalog asks them in
//! priority order and takes the first set it gets back.

use crate::error::{CatalogError, StrategyError};
use async_trait::async_trait;
use std::fmt;
use upgrade_patch::{PatchSet, VersionTag};

/// One way of loading the patch set registered under a version tag
///
/// Implement this trait to add a new catalog representation.
#[async_trait]
pub trait ResolutionStrategy: Send + Sync + fmt::Debug {
    /// Strategy name (for diagnostics)
    fn name(&self) -> &'static str;

    /// Strategy priority (higher = tried first)
    fn priority(&self) -> i32 {
        0
    }

    /// Raw tag names this representation knows about
    ///
    /// Names that are not valid semantic versions are dropped by the catalog.
    async fn tags(&self) -> Result<Vec<String>, CatalogError>;

    /// Load the patch set for `tag`
    ///
    /// # Returns
    /// - `Ok(Some(set))` when this representation holds the tag
    /// - `Ok(None)` when it does not
    /// - `Err` when it holds the tag but the set is unusable
    async fn resolve(&self, tag: &VersionTag) -> Result<Option<PatchSet>, StrategyError>;
}
