use clap::ValueEnum;
use semver::{BuildMetadata, Prerelease, Version};
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum IncrementError {
    #[error("incrementing {0} overflows")]
    Overflow(String),
    #[error(transparent)]
    Prerelease(#[from] semver::Error),
}

/// Which component of a semantic version a bump increments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum ReleaseType {
    Major,
    Minor,
    #[default]
    Patch,
    Build,
}

impl FromStr for ReleaseType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "major" => Ok(ReleaseType::Major),
            "minor" => Ok(ReleaseType::Minor),
            "patch" => Ok(ReleaseType::Patch),
            "build" => Ok(ReleaseType::Build),
            _ => Err(ConfigError::InvalidReleaseType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ReleaseType {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for ReleaseType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReleaseType::Major => "major",
            ReleaseType::Minor => "minor",
            ReleaseType::Patch => "patch",
            ReleaseType::Build => "build",
        };
        f.write_str(name)
    }
}

/// Parses a version the way it is usually written in metadata files.
///
/// Surrounding whitespace and a single leading `v` or `=` are accepted, the rest
/// must be a strict semantic version.
pub fn parse_version(text: &str) -> Option<Version> {
    let text = text.trim();
    let text = text
        .strip_prefix('v')
        .or_else(|| text.strip_prefix('='))
        .unwrap_or(text);
    Version::parse(text).ok()
}

/// Computes the next version for `release`. Build metadata is always dropped.
///
/// A pre-release is promoted to its release when the requested component is the
/// lowest one already set (`1.3.0-rc.1` bumped by `minor` becomes `1.3.0`), so the
/// result always has higher precedence than the input.
pub fn increment(version: &Version, release: ReleaseType) -> Result<Version, IncrementError> {
    let bump = |n: u64| {
        n.checked_add(1)
            .ok_or_else(|| IncrementError::Overflow(version.to_string()))
    };
    let mut next = version.clone();
    next.build = BuildMetadata::EMPTY;
    let released = version.pre.is_empty();

    match release {
        ReleaseType::Major => {
            if released || next.minor != 0 || next.patch != 0 {
                next.major = bump(next.major)?;
                next.minor = 0;
                next.patch = 0;
            }
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Minor => {
            if released || next.patch != 0 {
                next.minor = bump(next.minor)?;
                next.patch = 0;
            }
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Patch => {
            if released {
                next.patch = bump(next.patch)?;
            }
            next.pre = Prerelease::EMPTY;
        }
        ReleaseType::Build => {
            if released {
                next.patch = bump(next.patch)?;
                next.pre = Prerelease::new("0")?;
            } else {
                next.pre = next_build(&version.pre)?;
            }
        }
    }

    Ok(next)
}

/// Bumps the last numeric pre-release identifier, or appends `.0` when there is none.
fn next_build(pre: &Prerelease) -> Result<Prerelease, semver::Error> {
    let mut identifiers: Vec<String> = pre.as_str().split('.').map(str::to_string).collect();

    let bumped = identifiers.iter_mut().rev().any(|identifier| {
        match identifier.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
            Some(n) if identifier.bytes().all(|b| b.is_ascii_digit()) => {
                *identifier = n.to_string();
                true
            }
            _ => false,
        }
    });
    if !bumped {
        identifiers.push("0".to_string());
    }

    Prerelease::new(&identifiers.join("."))
}
