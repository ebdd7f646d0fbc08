//! Testing utilities for the upgrade workspace
//!
//! Scripted patches, an in-memory project and recording collaborators.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;
use upgrade_catalog::{BuiltinStrategy, CatalogError, PatchCatalog, ResolutionStrategy, StrategyError};
use upgrade_core::{Collaborators, MigrationOrchestrator, UpgradeConfig, UpgradeLogger};
use upgrade_manifest::{
    Manifest, ManifestError, ManifestFormatter, ManifestProvider, ManifestWriter, PackageManager,
    PackageManagerDetector, StaticVersionProvider,
};
use upgrade_patch::{Mode, Patch, PatchError, PatchOutcome, PatchSet, Version, VersionTag};

/// Shared record of patch invocations, in call order
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<(String, Mode)>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, description: &str, mode: Mode) {
        self.calls.lock().push((description.to_string(), mode));
    }

    pub fn calls(&self) -> Vec<(String, Mode)> {
        self.calls.lock().clone()
    }

    /// Descriptions invoked in `mode`, in call order
    pub fn descriptions(&self, mode: Mode) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|(_, m)| *m == mode)
            .map(|(d, _)| d.clone())
            .collect()
    }

    pub fn count(&self, mode: Mode) -> usize {
        self.calls.lock().iter().filter(|(_, m)| *m == mode).count()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Always reports work to do
    Apply,
    /// Always skips
    Skip(Option<String>),
    /// Always errors
    Fail(String),
    /// Applies until it has run once in apply mode, then skips
    Once,
}

/// Patch whose outcome is fixed up front
#[derive(Debug)]
pub struct ScriptedPatch {
    description: String,
    behavior: Behavior,
    applied: AtomicBool,
    log: CallLog,
    rendezvous: Option<Arc<Barrier>>,
}

impl ScriptedPatch {
    pub fn new(description: impl Into<String>, behavior: Behavior, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            description: description.into(),
            behavior,
            applied: AtomicBool::new(false),
            log: log.clone(),
            rendezvous: None,
        })
    }

    /// Applies once every patch sharing `barrier` is running at the same time
    pub fn meeting(description: impl Into<String>, barrier: &Arc<Barrier>, log: &CallLog) -> Arc<Self> {
        Arc::new(Self {
            description: description.into(),
            behavior: Behavior::Apply,
            applied: AtomicBool::new(false),
            log: log.clone(),
            rendezvous: Some(Arc::clone(barrier)),
        })
    }

    pub fn applying(description: impl Into<String>, log: &CallLog) -> Arc<Self> {
        Self::new(description, Behavior::Apply, log)
    }

    pub fn skipping(description: impl Into<String>, log: &CallLog) -> Arc<Self> {
        Self::new(description, Behavior::Skip(None), log)
    }

    pub fn failing(description: impl Into<String>, message: impl Into<String>, log: &CallLog) -> Arc<Self> {
        Self::new(description, Behavior::Fail(message.into()), log)
    }

    pub fn once(description: impl Into<String>, log: &CallLog) -> Arc<Self> {
        Self::new(description, Behavior::Once, log)
    }
}

#[async_trait]
impl Patch for ScriptedPatch {
    fn description(&self) -> &str {
        &self.description
    }

    async fn apply(&self, mode: Mode) -> Result<PatchOutcome, PatchError> {
        self.log.record(&self.description, mode);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        match &self.behavior {
            Behavior::Apply => Ok(PatchOutcome::Apply),
            Behavior::Skip(Some(reason)) => Ok(PatchOutcome::skip(reason.clone())),
            Behavior::Skip(None) => Ok(PatchOutcome::skipped()),
            Behavior::Fail(message) => Err(PatchError::failed(message.clone())),
            Behavior::Once if self.applied.load(Ordering::SeqCst) => {
                Ok(PatchOutcome::skip("already applied"))
            }
            Behavior::Once => {
                if mode.is_mutating() {
                    self.applied.store(true, Ordering::SeqCst);
                }
                Ok(PatchOutcome::Apply)
            }
        }
    }
}

pub fn tag(raw: &str) -> VersionTag {
    raw.parse().unwrap()
}

pub fn version(raw: &str) -> Version {
    Version::parse(raw).unwrap()
}

/// Builtin registry from `(tag, patch)` pairs, in registration order
pub fn builtin<P: Patch + 'static>(patches: impl IntoIterator<Item = (&'static str, Arc<P>)>) -> BuiltinStrategy {
    patches.into_iter().fold(BuiltinStrategy::new(), |registry, (raw, patch)| {
        registry.with_patch(tag(raw), patch)
    })
}

#[derive(Debug, Default)]
struct Counters {
    tags: AtomicUsize,
    resolve: AtomicUsize,
}

/// Builtin registry wrapper that counts how often it is consulted
///
/// Clones share counters, so a test can keep one and register the other.
#[derive(Debug, Clone, Default)]
pub struct CountingStrategy {
    inner: BuiltinStrategy,
    counters: Arc<Counters>,
}

impl CountingStrategy {
    pub fn new(inner: BuiltinStrategy) -> Self {
        Self {
            inner,
            counters: Arc::default(),
        }
    }

    pub fn tags_calls(&self) -> usize {
        self.counters.tags.load(Ordering::SeqCst)
    }

    pub fn resolve_calls(&self) -> usize {
        self.counters.resolve.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResolutionStrategy for CountingStrategy {
    fn name(&self) -> &'static str {
        "counting"
    }

    fn priority(&self) -> i32 {
        self.inner.priority()
    }

    async fn tags(&self) -> Result<Vec<String>, CatalogError> {
        self.counters.tags.fetch_add(1, Ordering::SeqCst);
        self.inner.tags().await
    }

    async fn resolve(&self, tag: &VersionTag) -> Result<Option<PatchSet>, StrategyError> {
        self.counters.resolve.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(tag).await
    }
}

#[derive(Debug, Default)]
struct ProjectState {
    package_json: Option<Value>,
    writes: Vec<(PathBuf, String)>,
}

/// A consumer project held in memory
///
/// Writes are parsed back into the manifest, so a second run sees the first
/// run's result.
#[derive(Debug, Clone)]
pub struct MemoryProject {
    path: PathBuf,
    state: Arc<Mutex<ProjectState>>,
}

impl MemoryProject {
    pub fn new(package_json: Value) -> Self {
        Self {
            path: PathBuf::from("/project/package.json"),
            state: Arc::new(Mutex::new(ProjectState {
                package_json: Some(package_json),
                writes: Vec::new(),
            })),
        }
    }

    /// A project with no manifest at all
    pub fn empty() -> Self {
        Self {
            path: PathBuf::from("/project/package.json"),
            state: Arc::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn package_json(&self) -> Option<Value> {
        self.state.lock().package_json.clone()
    }

    pub fn recorded_version(&self, key: &str) -> Option<String> {
        self.package_json()?
            .get(key)?
            .get("version")?
            .as_str()
            .map(str::to_string)
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    pub fn writes(&self) -> Vec<(PathBuf, String)> {
        self.state.lock().writes.clone()
    }
}

#[async_trait]
impl ManifestProvider for MemoryProject {
    async fn manifest(&self) -> Result<Option<Manifest>, ManifestError> {
        Ok(self
            .package_json()
            .map(|package_json| Manifest::new(&self.path, package_json)))
    }
}

#[async_trait]
impl ManifestWriter for MemoryProject {
    async fn write(&self, path: &Path, contents: &str) -> Result<(), ManifestError> {
        let parsed = serde_json::from_str(contents).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        let mut state = self.state.lock();
        state.package_json = Some(parsed);
        state.writes.push((path.to_path_buf(), contents.to_string()));
        Ok(())
    }
}

/// Formatter producing compact single-line JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactFormatter;

impl ManifestFormatter for CompactFormatter {
    fn format(&self, package_json: &Value) -> Result<String, ManifestError> {
        serde_json::to_string(package_json).map_err(ManifestError::Format)
    }
}

#[derive(Debug, Clone)]
pub struct FixedPackageManager(pub PackageManager);

#[async_trait]
impl PackageManagerDetector for FixedPackageManager {
    async fn detect(&self, _manifest: &Manifest) -> PackageManager {
        self.0.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Plain(String),
    Warn(String),
    Newline,
}

/// Logger that keeps every line and marks emphasis with `*` and `~`
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    lines: Arc<Mutex<Vec<LogLine>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().clone()
    }

    pub fn plain_lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter_map(|line| match line {
                LogLine::Plain(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter_map(|line| match line {
                LogLine::Warn(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl UpgradeLogger for RecordingLogger {
    fn plain(&self, message: &str) {
        self.lines.lock().push(LogLine::Plain(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().push(LogLine::Warn(message.to_string()));
    }

    fn newline(&self) {
        self.lines.lock().push(LogLine::Newline);
    }

    fn bold(&self, parts: &[&str]) -> String {
        format!("*{}*", parts.join(" "))
    }

    fn dim(&self, text: &str) -> String {
        format!("~{text}~")
    }
}

/// Everything a test needs to drive and inspect one orchestrator
#[derive(Debug, Clone)]
pub struct Harness {
    pub project: MemoryProject,
    pub logger: RecordingLogger,
    pub collaborators: Collaborators,
}

impl Harness {
    /// In-memory collaborators at tool version `current`, detecting pnpm
    pub fn new(project: MemoryProject, current: &str) -> Self {
        let logger = RecordingLogger::new();
        let collaborators = Collaborators {
            manifests: Arc::new(project.clone()),
            versions: Arc::new(StaticVersionProvider::new(version(current))),
            formatter: Arc::new(CompactFormatter),
            writer: Arc::new(project.clone()),
            package_manager: Arc::new(FixedPackageManager(PackageManager::PNPM)),
            logger: Arc::new(logger.clone()),
        };
        Self {
            project,
            logger,
            collaborators,
        }
    }

    pub fn orchestrator(&self, catalog: PatchCatalog) -> MigrationOrchestrator {
        MigrationOrchestrator::new(UpgradeConfig::new(), catalog, self.collaborators.clone())
    }
}

/// `package.json` with a `skuba` version record
pub fn package_json_at(recorded: &str) -> Value {
    serde_json::json!({
        "name": "my-service",
        "skuba": { "template": "express-rest-api", "version": recorded }
    })
}
