//! Version parsing and ordering for release tags.
//!
//! Release tags follow `MAJOR.MINOR.PATCH[-suffix]`, optionally prefixed with
//! `v`. The ordering used to decide whether an update is available is
//! deliberately simpler than full semver precedence:
//!
//! - numeric components compare by magnitude (`0.10.0 > 0.9.9`)
//! - for equal numeric triples, a version without a suffix is newer than any
//!   version with one (`1.0.0 > 1.0.0-beta.1`)
//! - suffix contents are not compared (`1.0.0-beta.2` is not newer than
//!   `1.0.0-beta.1`)
//!
//! Parsing never fails: missing or malformed numeric components count as `0`.

use std::cmp::Ordering;
use std::fmt;

/// A leniently parsed version string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    /// Whether the version carried a `-suffix`.
    pub prerelease: bool,
}

impl Version {
    /// Parse a version string, tolerating a leading `v`, build metadata and
    /// garbage components.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use assistd::upgrade::version::Version;
    ///
    /// let v = Version::parse("v1.2.3-rc.1");
    /// assert_eq!((v.major, v.minor, v.patch, v.prerelease), (1, 2, 3, true));
    ///
    /// let junk = Version::parse("1.x");
    /// assert_eq!((junk.major, junk.minor, junk.patch), (1, 0, 0));
    /// ```
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let without_build = trimmed.split('+').next().unwrap_or_default();

        let (core, prerelease) = match without_build.split_once('-') {
            Some((core, _suffix)) => (core, true),
            None => (without_build, false),
        };

        let mut parts = core.split('.').map(|p| p.trim().parse::<u64>().unwrap_or(0));

        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
            prerelease,
        }
    }

    fn sort_key(&self) -> (u64, u64, u64, bool) {
        (self.major, self.minor, self.patch, !self.prerelease)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.prerelease {
            write!(f, "-pre")?;
        }
        Ok(())
    }
}

/// Returns `true` when `new` sorts strictly after `current`.
#[must_use]
pub fn is_newer_version(current: &str, new: &str) -> bool {
    Version::parse(new) > Version::parse(current)
}

/// Strip a leading `v` from a release tag.
#[must_use]
pub fn strip_tag_prefix(tag: &str) -> &str {
    tag.strip_prefix('v').unwrap_or(tag)
}
