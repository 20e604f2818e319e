//! Version bumping for extension manifests.
//!
//! Pure functions: a current version plus a bump directive yields the next version.

use anyhow::Result;
use semver::{BuildMetadata, Prerelease, Version};
use std::fmt;
use std::str::FromStr;

use crate::error::PublishError;

/// How to compute the next version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BumpDirective {
    Major,
    Minor,
    Patch,
    /// An explicit version, already validated and canonical
    Exact(Version),
}

impl FromStr for BumpDirective {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(BumpDirective::Major),
            "minor" => Ok(BumpDirective::Minor),
            "patch" => Ok(BumpDirective::Patch),
            other => parse_loose(other)
                .map(BumpDirective::Exact)
                .ok_or_else(|| PublishError::InvalidVersion(other.to_string()).into()),
        }
    }
}

impl fmt::Display for BumpDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BumpDirective::Major => write!(f, "major"),
            BumpDirective::Minor => write!(f, "minor"),
            BumpDirective::Patch => write!(f, "patch"),
            BumpDirective::Exact(v) => write!(f, "{}", v),
        }
    }
}

/// Parse a version, tolerating surrounding whitespace and a leading `v` or `=`.
pub fn parse_loose(s: &str) -> Option<Version> {
    let trimmed = s.trim();
    let trimmed = trimmed
        .strip_prefix('=')
        .or_else(|| trimmed.strip_prefix('v'))
        .unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Compute the version that results from applying `directive` to `current`.
///
/// Keywords follow npm increment rules: a prerelease of the target release is
/// promoted to that release instead of skipping past it.
pub fn resolve_version(current: &str, directive: &str) -> Result<String> {
    let directive: BumpDirective = directive.parse()?;
    bump(current, &directive).map(|v| v.to_string())
}

/// Apply an already-parsed directive.
pub fn bump(current: &str, directive: &BumpDirective) -> Result<Version> {
    let parse_current = || {
        parse_loose(current).ok_or_else(|| PublishError::InvalidVersion(current.to_string()))
    };
    let next = match directive {
        BumpDirective::Exact(v) => return Ok(v.clone()),
        BumpDirective::Major => {
            let mut next = parse_current()?;
            if !(is_prerelease(&next) && next.minor == 0 && next.patch == 0) {
                next.major += 1;
                next.minor = 0;
                next.patch = 0;
            }
            next
        }
        BumpDirective::Minor => {
            let mut next = parse_current()?;
            if !(is_prerelease(&next) && next.patch == 0) {
                next.minor += 1;
                next.patch = 0;
            }
            next
        }
        BumpDirective::Patch => {
            let mut next = parse_current()?;
            if !is_prerelease(&next) {
                next.patch += 1;
            }
            next
        }
    };

    Ok(Version {
        pre: Prerelease::EMPTY,
        build: BuildMetadata::EMPTY,
        ..next
    })
}

fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}
