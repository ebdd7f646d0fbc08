//! Host package manager detection
//!
//! Only used to phrase the "run this command" hint.

use crate::manifest::Manifest;
use async_trait::async_trait;
use std::path::Path;

/// A package manager and its binary-runner prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageManager {
    /// Package manager name
    pub name: &'static str,
    /// Command used to run a locally installed binary
    pub exec: &'static str,
}

impl PackageManager {
    /// npm (`npx`)
    pub const NPM: Self = Self {
        name: "npm",
        exec: "npx",
    };
    /// pnpm (`pnpm exec`)
    pub const PNPM: Self = Self {
        name: "pnpm",
        exec: "pnpm exec",
    };
    /// Yarn (`yarn`)
    pub const YARN: Self = Self {
        name: "yarn",
        exec: "yarn",
    };

    /// Look up by name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "npm" => Some(Self::NPM),
            "pnpm" => Some(Self::PNPM),
            "yarn" => Some(Self::YARN),
            _ => None,
        }
    }
}

/// Detects the package manager a project uses
#[async_trait]
pub trait PackageManagerDetector: Send + Sync {
    /// Detect for the project owning `manifest`
    async fn detect(&self, manifest: &Manifest) -> PackageManager;
}

/// Detects from the manifest's `packageManager` field, then lockfiles,
/// falling back to npm
#[derive(Debug, Clone, Copy, Default)]
pub struct LockfilePackageManagerDetector;

impl LockfilePackageManagerDetector {
    async fn from_lockfiles(dir: &Path) -> Option<PackageManager> {
        for (lockfile, manager) in [
            ("pnpm-lock.yaml", PackageManager::PNPM),
            ("yarn.lock", PackageManager::YARN),
            ("package-lock.json", PackageManager::NPM),
        ] {
            if tokio::fs::try_exists(dir.join(lockfile)).await.unwrap_or(false) {
                return Some(manager);
            }
        }
        None
    }
}

#[async_trait]
impl PackageManagerDetector for LockfilePackageManagerDetector {
    async fn detect(&self, manifest: &Manifest) -> PackageManager {
        let declared = manifest
            .package_manager_field()
            .and_then(|field| field.split('@').next())
            .and_then(PackageManager::from_name);
        if let Some(manager) = declared {
            return manager;
        }

        let detected = Self::from_lockfiles(manifest.project_dir()).await;
        tracing::debug!(manager = ?detected.as_ref().map(|m| m.name), "package manager from lockfiles");
        detected.unwrap_or(PackageManager::NPM)
    }
}
