//! Upgrade Patch Catalog
//!
//! Discovers every version tag known to the catalog, keeps the tags at or
//! above a project's recorded version, and returns their patches in ascending
//! semantic-version order.
//!
//! # Architecture
//!
//! ```text
//! PatchCatalog ──tags()──▶ [Builtin, JsonIndex, YamlIndex] ──▶ BTreeSet<VersionTag>
//!      │
//!      └─resolve_tag(tag)─▶ first strategy returning Some(set) wins
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use upgrade_catalog::{BuiltinStrategy, PatchCatalog};
//!
//! let catalog = PatchCatalog::with_defaults(BuiltinStrategy::new(), Some("patches".into()), ".");
//! for resolved in catalog.resolve_applicable(&recorded).await? {
//!     println!("{} {}", resolved.version, resolved.description());
//! }
//! ```

#![warn(unreachable_pub)]

mod builtin;
mod catalog;
pub mod error;
mod index;
mod strategy;

pub use builtin::BuiltinStrategy;
pub use catalog::{PatchCatalog, ResolvedPatch};
pub use error::{CatalogError, ResolutionAttempt, StrategyError};
pub use index::{IndexFileStrategy, IndexFormat};
pub use strategy::ResolutionStrategy;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
