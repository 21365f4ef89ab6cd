//! Catalog tree placement and the read-only catalog index
//!
//! A submission lives at `applications/<category>/<id>/manifest.yml` inside
//! the catalog repository. This module derives that placement from the
//! manifest path, scans the rest of the tree for id collisions, and reads
//! the previously published manifest from the catalog repository's HEAD to
//! answer version-history queries. Manifests outside a catalog tree are
//! validated standalone: placement, uniqueness, and history checks are
//! skipped, the way the original tooling skips its category check.

use std::path::{Component, Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::manifest::{ApplicationManifest, MANIFEST_FILE_NAME, Version};

/// Name of the directory that roots the catalog's application tree
pub const APPLICATIONS_DIR: &str = "applications";

/// Where a manifest sits inside a catalog tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Directory containing `applications/`
    pub catalog_root: PathBuf,
    /// Category path component (`applications/<category>/...`)
    pub category: String,
    /// Application directory component (`.../<id>/manifest.yml`)
    pub app_dir: String,
    /// The manifest's own file name
    pub file_name: String,
}

/// Outcome of locating a manifest inside a catalog tree
#[derive(Debug)]
pub enum PlacementOutcome {
    /// Not inside an `applications/` tree; catalog checks don't apply
    Standalone,
    Catalog(Placement),
    /// Inside `applications/` but not at `<category>/<id>/manifest.yml`
    Invalid { reason: String },
}

impl Placement {
    /// Derive placement from the manifest path. The path should exist; it is
    /// canonicalized so relative invocations still find the tree.
    pub fn locate(manifest_path: &Path) -> PlacementOutcome {
        let absolute = manifest_path
            .canonicalize()
            .unwrap_or_else(|_| manifest_path.to_path_buf());

        let components: Vec<String> = absolute
            .components()
            .map(|c| match c {
                Component::Normal(s) => s.to_string_lossy().into_owned(),
                other => other.as_os_str().to_string_lossy().into_owned(),
            })
            .collect();

        let Some(apps_index) = components.iter().position(|c| c == APPLICATIONS_DIR) else {
            return PlacementOutcome::Standalone;
        };

        // applications/<category>/<app_dir>/<manifest file>
        if components.len() != apps_index + 4 {
            return PlacementOutcome::Invalid {
                reason: format!(
                    "manifest must sit at {APPLICATIONS_DIR}/<category>/<id>/{MANIFEST_FILE_NAME}, got '{}'",
                    manifest_path.display()
                ),
            };
        }

        let mut catalog_root = PathBuf::new();
        for part in absolute.components().take(components.len() - 4) {
            catalog_root.push(part);
        }

        PlacementOutcome::Catalog(Placement {
            catalog_root,
            category: components[apps_index + 1].clone(),
            app_dir: components[apps_index + 2].clone(),
            file_name: components[apps_index + 3].clone(),
        })
    }

    fn applications_dir(&self) -> PathBuf {
        self.catalog_root.join(APPLICATIONS_DIR)
    }
}

/// Another application already present in the catalog tree
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub category: String,
    pub app_dir: String,
}

/// Read-only view of every other manifest in the catalog tree
#[derive(Debug, Default)]
pub struct CatalogIndex {
    entries: Vec<IndexEntry>,
}

impl CatalogIndex {
    /// Walk `applications/*/*/manifest.yml`, excluding the manifest under
    /// validation. Unparsable or id-less entries are skipped; they are the
    /// review workflow's problem, not this submission's.
    pub fn scan(placement: &Placement, manifest_path: &Path) -> Self {
        let exclude = manifest_path
            .canonicalize()
            .unwrap_or_else(|_| manifest_path.to_path_buf());

        let mut entries = Vec::new();
        for entry in WalkDir::new(placement.applications_dir())
            .min_depth(3)
            .max_depth(3)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.file_name().to_string_lossy() == MANIFEST_FILE_NAME)
        {
            let path = entry.path();
            if path.canonicalize().map(|p| p == exclude).unwrap_or(false) {
                continue;
            }

            let Ok(text) = std::fs::read_to_string(path) else {
                continue;
            };
            let Ok(manifest) = ApplicationManifest::from_yaml(&text) else {
                debug!(path = %path.display(), "skipping unparsable catalog entry");
                continue;
            };
            if manifest.id.is_empty() {
                continue;
            }

            let rel: Vec<String> = path
                .strip_prefix(placement.applications_dir())
                .map(|p| {
                    p.components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect()
                })
                .unwrap_or_default();

            entries.push(IndexEntry {
                id: manifest.id,
                category: rel.first().cloned().unwrap_or_default(),
                app_dir: rel.get(1).cloned().unwrap_or_default(),
            });
        }

        Self { entries }
    }

    /// A same-id entry in a different application directory, if any
    pub fn find_duplicate(&self, id: &str, app_dir: &str) -> Option<&IndexEntry> {
        self.entries
            .iter()
            .find(|e| e.id == id && e.app_dir != app_dir)
    }
}

/// The previously published state of this application, read from the
/// catalog repository's HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishedState {
    /// First publication (no catalog repository, or the path is new)
    NotPublished,
    Published {
        version: Option<Version>,
        /// The working-tree manifest is byte-identical to HEAD: this is a
        /// re-validation of the published state, not a new submission
        identical: bool,
    },
}

/// Read the published manifest for this submission from the catalog
/// repository's HEAD. The working tree holds the submission; HEAD holds
/// what the review workflow last merged.
pub fn published_state(manifest_path: &Path) -> PublishedState {
    let Ok(absolute) = manifest_path.canonicalize() else {
        return PublishedState::NotPublished;
    };
    let start = absolute.parent().unwrap_or(&absolute);
    let Ok(repo) = git2::Repository::discover(start) else {
        return PublishedState::NotPublished;
    };
    let Some(workdir) = repo.workdir().and_then(|w| w.canonicalize().ok()) else {
        return PublishedState::NotPublished;
    };
    let Ok(rel) = absolute.strip_prefix(&workdir) else {
        return PublishedState::NotPublished;
    };

    let Some(blob) = head_blob(&repo, rel) else {
        return PublishedState::NotPublished;
    };

    let identical = std::fs::read(&absolute)
        .map(|current| current == blob)
        .unwrap_or(false);

    let version = std::str::from_utf8(&blob)
        .ok()
        .and_then(|text| ApplicationManifest::from_yaml(text).ok())
        .and_then(|m| m.version.parse().ok());

    PublishedState::Published { version, identical }
}

fn head_blob(repo: &git2::Repository, rel: &Path) -> Option<Vec<u8>> {
    let head = repo.head().ok()?.peel_to_tree().ok()?;
    let entry = head.get_path(rel).ok()?;
    let blob = entry.to_object(repo).ok()?.peel_to_blob().ok()?;
    Some(blob.content().to_vec())
}
