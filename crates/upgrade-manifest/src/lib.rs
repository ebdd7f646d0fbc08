//! Upgrade Manifest Collaborators
//!
//! The trusted boundary between the upgrade engine and the consumer
//! project's files.
//!
//! # Core Operations
//!
//! - **Ingress**: locate and parse `package.json` ([`ManifestProvider`])
//! - **Record**: read and advance the version record ([`Manifest`])
//! - **Egress**: render ([`ManifestFormatter`]) and persist ([`ManifestWriter`])
//! - **Context**: tool version ([`VersionProvider`]) and package manager
//!   ([`PackageManagerDetector`])
//!
//! Every collaborator is a trait so the orchestrator can be driven by test
//! doubles; the `Fs*`, `Json*`, `Static*` and `Lockfile*` types are the
//! production implementations.

#![warn(unreachable_pub)]

pub mod error;
mod format;
mod manifest;
mod package_manager;
mod version;

pub use error::ManifestError;
pub use format::{FsManifestWriter, JsonManifestFormatter, ManifestFormatter, ManifestWriter};
pub use manifest::{FsManifestProvider, Manifest, ManifestProvider};
pub use package_manager::{LockfilePackageManagerDetector, PackageManager, PackageManagerDetector};
pub use version::{StaticVersionProvider, VersionProvider};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
