// src/version.rs

//! NuGet-style version parsing and ordering.
//!
//! NuGet versions extend semver with an optional fourth numeric component
//! (revision) and legacy four-part forms. Release labels order according to
//! semver precedence rules; build metadata is retained for equality but
//! stripped from the normalized form used in URIs and file names.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A parsed NuGet package version
///
/// Ordering follows semver precedence extended to four numeric parts.
/// Equality includes build metadata; two events for `1.0.0+a` and `1.0.0+b`
/// are distinct, while their normalized download paths coincide.
#[derive(Debug, Clone)]
pub struct NuGetVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub revision: u64,
    /// Dot-separated pre-release labels, original case preserved
    pub release: Vec<String>,
    /// Build metadata after `+`, original case preserved
    pub metadata: Option<String>,
}

impl NuGetVersion {
    /// Parse a version string
    ///
    /// Format: major[.minor[.patch[.revision]]][-release][+metadata]
    /// Examples:
    /// - "1.0" → 1.0.0
    /// - "1.2.3.4" → four-part legacy version
    /// - "1.0.0-beta.2+sha.abc" → release labels ["beta", "2"], metadata "sha.abc"
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::Version(s.to_string(), "empty string".to_string()));
        }

        let (rest, metadata) = match s.split_once('+') {
            Some((_, m)) if m.is_empty() => {
                return Err(Error::Version(s.to_string(), "empty metadata".to_string()));
            }
            Some((r, m)) => (r, Some(m.to_string())),
            None => (s, None),
        };

        let (numeric, release) = match rest.split_once('-') {
            Some((_, r)) if r.is_empty() => {
                return Err(Error::Version(s.to_string(), "empty release".to_string()));
            }
            Some((n, r)) => (n, r.split('.').map(str::to_string).collect()),
            None => (rest, Vec::new()),
        };

        let parts: Vec<&str> = numeric.split('.').collect();
        if parts.is_empty() || parts.len() > 4 {
            return Err(Error::Version(
                s.to_string(),
                format!("{} numeric components", parts.len()),
            ));
        }

        let mut nums = [0u64; 4];
        for (i, part) in parts.iter().enumerate() {
            nums[i] = part.parse::<u64>().map_err(|e| {
                Error::Version(s.to_string(), format!("bad numeric component '{part}': {e}"))
            })?;
        }

        Ok(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            revision: nums[3],
            release,
            metadata,
        })
    }

    /// True when the version carries pre-release labels
    pub fn is_prerelease(&self) -> bool {
        !self.release.is_empty()
    }

    /// Normalized form: metadata stripped, revision shown only when non-zero
    ///
    /// Release label case is preserved; callers building URIs or file names
    /// lowercase the result.
    pub fn normalized(&self) -> String {
        let mut out = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if self.revision > 0 {
            out.push_str(&format!(".{}", self.revision));
        }
        if !self.release.is_empty() {
            out.push('-');
            out.push_str(&self.release.join("."));
        }
        out
    }

    /// Lowercased normalized form, as used in download paths and cache keys
    pub fn normalized_lower(&self) -> String {
        self.normalized().to_lowercase()
    }

    /// Compare two versions by semver precedence
    pub fn compare(&self, other: &NuGetVersion) -> Ordering {
        let nums = (self.major, self.minor, self.patch, self.revision).cmp(&(
            other.major,
            other.minor,
            other.patch,
            other.revision,
        ));
        if nums != Ordering::Equal {
            return nums;
        }

        match (self.release.is_empty(), other.release.is_empty()) {
            (true, true) => {}
            // A release version sorts above any of its pre-releases
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {
                let ord = compare_release_labels(&self.release, &other.release);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }

        // Metadata is not semver precedence, but a total order keeps sorted
        // sets deterministic when events differ only in metadata.
        let a = self.metadata.as_deref().unwrap_or("").to_lowercase();
        let b = other.metadata.as_deref().unwrap_or("").to_lowercase();
        a.cmp(&b)
    }
}

/// Semver label comparison: numeric labels order numerically and below
/// alphanumeric labels; alphanumeric labels compare case-insensitively.
fn compare_release_labels(a: &[String], b: &[String]) -> Ordering {
    for pair in a.iter().zip(b.iter()) {
        let (x, y) = pair;
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(xn), Ok(yn)) => xn.cmp(&yn),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => x.to_lowercase().cmp(&y.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

impl FromStr for NuGetVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        NuGetVersion::parse(s)
    }
}

impl fmt::Display for NuGetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())?;
        if let Some(ref meta) = self.metadata {
            write!(f, "+{}", meta)?;
        }
        Ok(())
    }
}

impl PartialEq for NuGetVersion {
    fn eq(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl Eq for NuGetVersion {}

impl Hash for NuGetVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with the precedence-based equality: numeric labels
        // hash as numbers, alphanumeric ones case-insensitively.
        (self.major, self.minor, self.patch, self.revision).hash(state);
        for label in &self.release {
            match label.parse::<u64>() {
                Ok(n) => n.hash(state),
                Err(_) => label.to_lowercase().hash(state),
            }
        }
        self.metadata
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .hash(state);
    }
}

impl Ord for NuGetVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialOrd for NuGetVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
