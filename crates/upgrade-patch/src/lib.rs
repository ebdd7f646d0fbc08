//! Upgrade Patch Units
//!
//! The contract every upgrade step satisfies, plus the data-driven patch kinds
//! that can be loaded from a catalog index file.
//!
//! # Core Concepts
//!
//! - [`Patch`]: one self-contained upgrade step
//! - [`Mode`]: `Check` (read-only) or `Apply` (mutating)
//! - [`PatchOutcome`]: `Apply` or `Skip { reason }`
//! - [`VersionTag`]: the tool version a patch was introduced in
//! - [`DeclarativePatch`]: file edits described as data
//!
//! # Example
//!
//! ```rust,ignore
//! use upgrade_patch::{Mode, Patch, PatchOutcome};
//!
//! let outcome = patch.apply(Mode::Check).await?;
//! if outcome.is_skip() {
//!     println!("nothing to do for {}", patch.description());
//! }
//! ```

#![warn(unreachable_pub)]

pub mod declarative;
pub mod error;
mod patch;
mod version;

pub use declarative::{DeclarativePatch, PatchAction, PatchIndex, PatchSpec};
pub use error::PatchError;
pub use patch::{Mode, Patch, PatchOutcome, PatchSet};
pub use version::{parse_version, VersionTag};

/// Re-exported so downstream crates share one `Version` type
pub use semver::Version;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
