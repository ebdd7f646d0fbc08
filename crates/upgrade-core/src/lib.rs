//! Upgrade Core - Migration Orchestrator
//!
//! The entry point that:
//! - Compares the version recorded in a project's manifest with the tool's
//! - Resolves every patch introduced since the recorded version
//! - Reports pending patches without touching the project (`Check`)
//! - Applies them in order and advances the record (`Apply`)
//!
//! # Example
//!
//! ```rust,ignore
//! use upgrade_core::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = MigrationOrchestrator::for_project(
//!     UpgradeConfig::new().with_patches_dir("patches"),
//!     ".",
//!     Version::new(1, 2, 0),
//!     BuiltinStrategy::new(),
//! );
//!
//! let result = orchestrator.run(Mode::Check).await?;
//! println!("ok: {}", result.ok());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod logger;
pub mod orchestrator;
pub mod result;

pub use config::UpgradeConfig;
pub use error::UpgradeError;
pub use logger::{TracingLogger, UpgradeLogger};
pub use orchestrator::{Collaborators, MigrationOrchestrator};
pub use result::{Annotation, MigrationResult, PatchReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving an upgrade
    pub use crate::{
        Collaborators, MigrationOrchestrator, MigrationResult, UpgradeConfig, UpgradeError,
        UpgradeLogger,
    };
    pub use upgrade_catalog::{BuiltinStrategy, PatchCatalog};
    pub use upgrade_patch::{Mode, Patch, PatchOutcome, Version, VersionTag};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
