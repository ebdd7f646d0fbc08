//! Version tags
//!
//! Tags compare by semantic-version precedence, never lexically, so
//! `1.10.0` sorts after `1.9.0`. Build metadata is ignored.

use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Parse a version string, tolerating surrounding whitespace and a leading `v`
pub fn parse_version(input: &str) -> Result<Version, semver::Error> {
    let trimmed = input.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
}

/// The tool version a group of patches was introduced in
#[derive(Debug, Clone)]
pub struct VersionTag(Version);

impl VersionTag {
    /// Wrap a parsed version
    #[inline]
    #[must_use]
    pub fn new(version: Version) -> Self {
        Self(version)
    }

    /// Underlying version
    #[inline]
    #[must_use]
    pub fn version(&self) -> &Version {
        &self.0
    }

    /// Whether this tag is at or above `recorded` (inclusive)
    #[inline]
    #[must_use]
    pub fn applies_to(&self, recorded: &Version) -> bool {
        self.0.cmp_precedence(recorded) != Ordering::Less
    }
}

impl PartialEq for VersionTag {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionTag {}

impl PartialOrd for VersionTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp_precedence(&other.0)
    }
}

impl FromStr for VersionTag {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s).map(Self)
    }
}

impl From<Version> for VersionTag {
    fn from(version: Version) -> Self {
        Self(version)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
