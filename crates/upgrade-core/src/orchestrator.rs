//! Migration Orchestrator
//!
//! Compares the project's recorded version with the tool's, resolves the
//! pending patches and runs them:
//! - `Check`: all patches concurrently, read-only, report whether any apply
//! - `Apply`: patches one at a time in catalog order, then advance the record
//!
//! The manifest is written once, after the last patch, and only in apply
//! mode.

use crate::config::UpgradeConfig;
use crate::error::UpgradeError;
use crate::logger::{TracingLogger, UpgradeLogger};
use crate::result::{Annotation, MigrationResult, PatchReport};
use futures::future::try_join_all;
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::Arc;
use upgrade_catalog::{BuiltinStrategy, PatchCatalog, ResolvedPatch};
use upgrade_manifest::{
    FsManifestProvider, FsManifestWriter, JsonManifestFormatter, LockfilePackageManagerDetector,
    Manifest, ManifestFormatter, ManifestProvider, ManifestWriter, PackageManagerDetector,
    StaticVersionProvider, VersionProvider,
};
use upgrade_patch::{parse_version, Mode, PatchOutcome, Version};

/// External collaborators the orchestrator drives
#[derive(Clone)]
pub struct Collaborators {
    /// Locates the consumer manifest
    pub manifests: Arc<dyn ManifestProvider>,
    /// Supplies the tool's current version
    pub versions: Arc<dyn VersionProvider>,
    /// Renders the manifest to text
    pub formatter: Arc<dyn ManifestFormatter>,
    /// Persists the rendered manifest
    pub writer: Arc<dyn ManifestWriter>,
    /// Phrases the re-run hint
    pub package_manager: Arc<dyn PackageManagerDetector>,
    /// Run log
    pub logger: Arc<dyn UpgradeLogger>,
}

impl Collaborators {
    /// Filesystem-backed collaborators for the project at `project_dir`
    #[must_use]
    pub fn filesystem(project_dir: impl Into<PathBuf>, tool_version: Version, config: &UpgradeConfig) -> Self {
        Self {
            manifests: Arc::new(FsManifestProvider::new(project_dir)),
            versions: Arc::new(StaticVersionProvider::new(tool_version)),
            formatter: Arc::new(JsonManifestFormatter::new(config.indent)),
            writer: Arc::new(FsManifestWriter),
            package_manager: Arc::new(LockfilePackageManagerDetector),
            logger: Arc::new(TracingLogger),
        }
    }

    /// Replace the run log
    #[inline]
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn UpgradeLogger>) -> Self {
        self.logger = logger;
        self
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// The top-level upgrade entry point
///
/// Owns the catalog and collaborators; each [`run`](Self::run) owns its
/// manifest from read to (at most one) write.
#[derive(Debug)]
pub struct MigrationOrchestrator {
    config: UpgradeConfig,
    catalog: PatchCatalog,
    collaborators: Collaborators,
}

impl MigrationOrchestrator {
    /// Create orchestrator
    #[inline]
    #[must_use]
    pub fn new(config: UpgradeConfig, catalog: PatchCatalog, collaborators: Collaborators) -> Self {
        Self {
            config,
            catalog,
            collaborators,
        }
    }

    /// Orchestrator for a project on disk, using the standard catalog chain
    /// rooted at `config.patches_dir`
    #[must_use]
    pub fn for_project(
        config: UpgradeConfig,
        project_dir: impl Into<PathBuf>,
        tool_version: Version,
        builtin: BuiltinStrategy,
    ) -> Self {
        let project_dir = project_dir.into();
        let catalog = PatchCatalog::with_defaults(builtin, config.patches_dir.clone(), &project_dir);
        let collaborators = Collaborators::filesystem(project_dir, tool_version, &config);
        Self::new(config, catalog, collaborators)
    }

    /// Get configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    /// Get catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &PatchCatalog {
        &self.catalog
    }

    /// Bring the project up to date (`Apply`) or report whether it is (`Check`)
    ///
    /// # Workflow
    /// 1. Read tool version and manifest concurrently
    /// 2. Default a missing version record
    /// 3. Short-circuit when the record is current
    /// 4. Resolve applicable patches; short-circuit when there are none
    /// 5. Check concurrently, or apply sequentially and persist
    ///
    /// # Errors
    /// - `UpgradeError::ManifestNotFound` if the project has no manifest
    /// - `UpgradeError::PatchResolution` if a tag's patches cannot be loaded
    /// - `UpgradeError::PatchExecution` if a patch fails; nothing is written
    pub async fn run(&self, mode: Mode) -> Result<MigrationResult, UpgradeError> {
        let (current, manifest) = tokio::try_join!(
            async { Ok::<_, UpgradeError>(self.collaborators.versions.current_version().await?) },
            async { Ok::<_, UpgradeError>(self.collaborators.manifests.manifest().await?) },
        )?;
        let mut manifest = manifest.ok_or(UpgradeError::ManifestNotFound)?;

        let recorded = self.recorded_version(&mut manifest)?;
        tracing::info!(%mode, %recorded, %current, manifest = %manifest.path.display(), "starting upgrade");

        if recorded.cmp_precedence(&current) != Ordering::Less {
            tracing::debug!("recorded version is current, skipping patches");
            return Ok(MigrationResult::UpToDate);
        }

        let patches = self.catalog.resolve_applicable(&recorded).await?;
        if patches.is_empty() {
            tracing::debug!("no patches apply to this version range");
            return Ok(MigrationResult::UpToDate);
        }

        match mode {
            Mode::Check => self.check(&manifest, &patches).await,
            Mode::Apply => self.apply(manifest, &patches, &current).await,
        }
    }

    fn recorded_version(&self, manifest: &mut Manifest) -> Result<Version, UpgradeError> {
        let raw = manifest.ensure_version_record(&self.config.manifest_key, &self.config.default_version)?;
        parse_version(&raw).map_err(|e| UpgradeError::invalid_version("recorded version", raw, e))
    }

    async fn check(
        &self,
        manifest: &Manifest,
        patches: &[ResolvedPatch],
    ) -> Result<MigrationResult, UpgradeError> {
        let outcomes = try_join_all(patches.iter().map(|p| p.patch.apply(Mode::Check))).await?;

        let pending = outcomes.iter().filter(|o| !o.is_skip()).count();
        tracing::debug!(pending, total = patches.len(), "check complete");
        if pending == 0 {
            return Ok(MigrationResult::UpToDate);
        }

        let logger = &self.collaborators.logger;
        let tool = &self.config.tool_name;
        let command = &self.config.apply_command;
        let package_manager = self.collaborators.package_manager.detect(manifest).await;

        logger.warn(&format!(
            "{tool} has patches to apply. Run {} to run them. {}",
            logger.bold(&[package_manager.exec, tool.as_str(), command.as_str()]),
            logger.dim(&format!("{tool}-patches")),
        ));

        Ok(MigrationResult::Fixable {
            annotations: vec![Annotation {
                path: manifest.path.clone(),
                message: format!(
                    "{tool} has patches to apply. Run {} {tool} {command} to run them.",
                    package_manager.exec
                ),
            }],
        })
    }

    async fn apply(
        &self,
        mut manifest: Manifest,
        patches: &[ResolvedPatch],
        current: &Version,
    ) -> Result<MigrationResult, UpgradeError> {
        let logger = &self.collaborators.logger;
        let tool = &self.config.tool_name;
        logger.plain(&format!("Updating {tool}..."));

        // Sequential: a patch may rely on files an earlier one wrote
        let mut reports = Vec::with_capacity(patches.len());
        for resolved in patches {
            let outcome = resolved.patch.apply(Mode::Apply).await?;
            logger.newline();
            match &outcome {
                PatchOutcome::Skip { reason } => logger.plain(&format!(
                    "Patch skipped: {}{}",
                    resolved.description(),
                    reason.as_deref().map(|r| format!(" - {r}")).unwrap_or_default()
                )),
                PatchOutcome::Apply => {
                    logger.plain(&format!("Patch applied: {}", resolved.description()));
                }
            }
            tracing::debug!(version = %resolved.version, patch = resolved.description(), skipped = outcome.is_skip(), "patch finished");
            reports.push(PatchReport {
                version: resolved.version.to_string(),
                description: resolved.description().to_string(),
                outcome,
            });
        }

        manifest.set_recorded_version(&self.config.manifest_key, current)?;
        let rendered = self.collaborators.formatter.format(&manifest.package_json)?;
        self.collaborators.writer.write(&manifest.path, &rendered).await?;

        logger.newline();
        logger.plain(&format!("{tool} update complete."));
        logger.newline();
        tracing::info!(version = %current, patches = reports.len(), "version record advanced");

        Ok(MigrationResult::Applied { reports })
    }
}
