//! Application manifest (manifest.yml) data structures
//!
//! The manifest is the declarative unit of work: it names the application,
//! points at its source repository pinned to a commit, and carries the
//! catalog-facing metadata. Conditionally required fields (`name`, `id`,
//! `category`, `version`) may be left empty and filled from the build
//! descriptor in the fetched source tree; see [`crate::resolver`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CatpackError, Result};

/// Marker prefix for fields whose value is loaded from a file in the
/// fetched source tree (`description: "@README.md"`).
pub const FILE_REF_PREFIX: char = '@';

/// Name the manifest file must have inside a catalog tree
pub const MANIFEST_FILE_NAME: &str = "manifest.yml";

/// Where the application's source code lives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeLocation {
    /// Source kind; only "git" is supported
    #[serde(rename = "type")]
    pub kind: String,

    pub location: RepoLocation,
}

/// Repository coordinates: origin URL plus a pinned commit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoLocation {
    #[serde(default)]
    pub origin: String,

    #[serde(default)]
    pub commit_sha: String,

    /// Application root inside the repository, when it is not the repo root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdir: Option<String>,
}

/// A submitted application manifest
///
/// String fields default to empty rather than `Option` so that the
/// two-source merge with the build descriptor is a uniform
/// "empty means absent" lookup, the same convention the descriptor uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationManifest {
    pub sourcecode: CodeLocation,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub short_description: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub changelog: String,

    #[serde(default)]
    pub screenshots: Vec<String>,

    #[serde(default)]
    pub targets: Vec<String>,
}

impl ApplicationManifest {
    /// Load and parse a manifest from disk
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CatpackError::ManifestNotFound {
                path: path.display().to_string(),
            });
        }

        let text = std::fs::read_to_string(path).map_err(|e| CatpackError::ManifestReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_yaml(&text).map_err(|e| match e {
            CatpackError::ManifestParseFailed { reason, .. } => {
                CatpackError::ManifestParseFailed {
                    path: path.display().to_string(),
                    reason,
                }
            }
            other => other,
        })
    }

    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CatpackError::ManifestParseFailed {
            path: String::new(),
            reason: e.to_string(),
        })
    }

    /// Serialize the (resolved) manifest back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| CatpackError::FileWriteFailed {
            path: MANIFEST_FILE_NAME.to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize the (resolved) manifest to JSON for `--json-manifest`
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CatpackError::FileWriteFailed {
            path: "json manifest".to_string(),
            reason: e.to_string(),
        })
    }

    /// Whether a field value is an `@path` reference into the source tree
    pub fn is_file_ref(value: &str) -> bool {
        value.starts_with(FILE_REF_PREFIX)
    }
}

/// Application version as an ordered (major, minor) pair
///
/// Ordering is lexicographic: major first, then minor. The catalog requires
/// each resubmission to be strictly greater than the published version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s.split_once('.').ok_or(())?;
        if major.is_empty()
            || minor.is_empty()
            || !major.chars().all(|c| c.is_ascii_digit())
            || !minor.chars().all(|c| c.is_ascii_digit())
        {
            return Err(());
        }
        Ok(Self {
            major: major.parse().map_err(|_| ())?,
            minor: minor.parse().map_err(|_| ())?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
