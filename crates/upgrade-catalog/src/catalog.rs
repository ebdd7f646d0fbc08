//! Patch catalog - ordered resolution of applicable patches

use crate::builtin::BuiltinStrategy;
use crate::error::{CatalogError, ResolutionAttempt};
use crate::index::IndexFileStrategy;
use crate::strategy::ResolutionStrategy;
use futures::future::try_join_all;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use upgrade_patch::{Patch, PatchSet, Version, VersionTag};

/// A patch together with the tag it was resolved under
#[derive(Debug, Clone)]
pub struct ResolvedPatch {
    /// Version tag the patch belongs to
    pub version: VersionTag,
    /// The patch itself
    pub patch: Arc<dyn Patch>,
}

impl ResolvedPatch {
    /// Patch description
    #[inline]
    #[must_use]
    pub fn description(&self) -> &str {
        self.patch.description()
    }
}

/// The full set of known patches, grouped by version tag
///
/// Holds an ordered chain of [`ResolutionStrategy`] values. Strategies with
/// equal priority keep their registration order.
#[derive(Debug, Default)]
pub struct PatchCatalog {
    strategies: Vec<Box<dyn ResolutionStrategy>>,
}

impl PatchCatalog {
    /// Create catalog with no strategies
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Standard chain: compiled-in patches, then `index.json`, then
    /// `index.yaml` under `patches_root`
    #[must_use]
    pub fn with_defaults(
        builtin: BuiltinStrategy,
        patches_root: Option<PathBuf>,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let project_root = project_root.into();
        let mut catalog = Self::new().with_strategy(builtin);
        if let Some(root) = patches_root {
            catalog.register(IndexFileStrategy::json(&root, &project_root));
            catalog.register(IndexFileStrategy::yaml(root, project_root));
        }
        catalog
    }

    /// Register a strategy
    pub fn register<S: ResolutionStrategy + 'static>(&mut self, strategy: S) {
        self.strategies.push(Box::new(strategy));
        // Stable sort keeps registration order among equal priorities
        self.strategies
            .sort_by_key(|s| std::cmp::Reverse(s.priority()));
    }

    /// Builder form of [`register`](Self::register)
    #[inline]
    #[must_use]
    pub fn with_strategy<S: ResolutionStrategy + 'static>(mut self, strategy: S) -> Self {
        self.register(strategy);
        self
    }

    /// Strategy names in the order they are tried
    #[must_use]
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Every known tag, ascending
    ///
    /// The same tag listed by several strategies appears once. Two tags that
    /// differ only in build metadata are rejected.
    ///
    /// # Errors
    /// - `CatalogError::Io` if a strategy cannot enumerate its tags
    /// - `CatalogError::AmbiguousTag` if two tags have equal precedence
    pub async fn tags(&self) -> Result<Vec<VersionTag>, CatalogError> {
        let mut tags: BTreeSet<VersionTag> = BTreeSet::new();
        for strategy in &self.strategies {
            for raw in strategy.tags().await? {
                match raw.parse::<VersionTag>() {
                    Ok(tag) => match tags.get(&tag) {
                        Some(existing) if existing.version() != tag.version() => {
                            return Err(CatalogError::AmbiguousTag {
                                first: existing.to_string(),
                                second: tag.to_string(),
                            });
                        }
                        Some(_) => {}
                        None => {
                            tags.insert(tag);
                        }
                    },
                    Err(e) => {
                        tracing::warn!(
                            strategy = strategy.name(),
                            entry = %raw,
                            error = %e,
                            "ignoring catalog entry that is not a version"
                        );
                    }
                }
            }
        }
        Ok(tags.into_iter().collect())
    }

    /// Patches applicable to a project recorded at `recorded`
    ///
    /// # Returns
    /// Patches of every tag `>= recorded`, tags ascending, each tag's set in
    /// catalog order. Empty when no tag qualifies.
    ///
    /// # Errors
    /// - `CatalogError::PatchResolution` if any qualifying tag cannot be loaded
    pub async fn resolve_applicable(
        &self,
        recorded: &Version,
    ) -> Result<Vec<ResolvedPatch>, CatalogError> {
        let applicable: Vec<VersionTag> = self
            .tags()
            .await?
            .into_iter()
            .filter(|tag| tag.applies_to(recorded))
            .collect();

        tracing::debug!(
            recorded = %recorded,
            tags = ?applicable.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "applicable version tags"
        );

        let sets = try_join_all(applicable.iter().map(|tag| self.resolve_tag(tag))).await?;

        Ok(applicable
            .into_iter()
            .zip(sets)
            .flat_map(|(tag, set)| {
                set.into_iter().map(move |patch| ResolvedPatch {
                    version: tag.clone(),
                    patch,
                })
            })
            .collect())
    }

    /// Load one tag's patch set through the strategy chain
    ///
    /// # Errors
    /// - `CatalogError::PatchResolution` if every strategy misses
    pub async fn resolve_tag(&self, tag: &VersionTag) -> Result<PatchSet, CatalogError> {
        let mut attempts = Vec::with_capacity(self.strategies.len());

        for strategy in &self.strategies {
            match strategy.resolve(tag).await {
                Ok(Some(set)) => {
                    tracing::debug!(%tag, strategy = strategy.name(), patches = set.len(), "resolved patch set");
                    return Ok(set);
                }
                Ok(None) => attempts.push(ResolutionAttempt {
                    strategy: strategy.name(),
                    reason: "not present".to_string(),
                }),
                Err(e) => {
                    tracing::debug!(%tag, strategy = strategy.name(), error = %e, "strategy failed");
                    attempts.push(ResolutionAttempt {
                        strategy: strategy.name(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        Err(CatalogError::PatchResolution {
            tag: tag.to_string(),
            attempts,
        })
    }
}
