//! Fetched source trees and the fetch abstraction
//!
//! Fetching "the repository at this commit" is behind the [`SourceFetcher`]
//! trait so validation logic can be exercised against fixture directories
//! without network access. The production implementation ([`GitFetcher`])
//! clones the origin and checks out the pinned commit.
//!
//! All path lookups into a fetched tree go through [`SourceTree::resolve`],
//! which rejects traversal outside the checkout. Manifest-supplied paths are
//! untrusted input.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::info;

use crate::error::{CatpackError, Result};
use crate::git;

/// A fetched source checkout, possibly re-rooted at the manifest's `subdir`
#[derive(Debug)]
pub struct SourceTree {
    /// Owns the checkout directory; dropped (and deleted) with the tree.
    /// `None` for fixture-backed trees rooted in caller-owned directories.
    _checkout: Option<TempDir>,
    root: PathBuf,
}

impl SourceTree {
    /// Tree owning a temporary checkout directory
    pub fn from_checkout(checkout: TempDir) -> Result<Self> {
        let root = checkout.path().canonicalize()?;
        Ok(Self {
            _checkout: Some(checkout),
            root,
        })
    }

    /// Tree rooted in a caller-owned directory (fixtures)
    #[cfg(test)]
    pub fn from_dir(root: &Path) -> Result<Self> {
        Ok(Self {
            _checkout: None,
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-root the tree at `subdir`, keeping ownership of the checkout.
    /// The subdirectory must exist and stay inside the checkout.
    pub fn scoped(self, subdir: Option<&str>) -> Result<Self> {
        let Some(subdir) = subdir else {
            return Ok(self);
        };

        let candidate = self.root.join(subdir);
        let resolved = candidate
            .canonicalize()
            .map_err(|_| CatpackError::FileNotFound {
                path: subdir.to_string(),
            })?;

        if !resolved.starts_with(&self.root) {
            return Err(CatpackError::PathTraversal {
                path: subdir.to_string(),
            });
        }
        if !resolved.is_dir() {
            return Err(CatpackError::FileNotFound {
                path: subdir.to_string(),
            });
        }

        Ok(Self {
            _checkout: self._checkout,
            root: resolved,
        })
    }

    /// Resolve a manifest-supplied relative path to an existing file inside
    /// the tree
    pub fn resolve(&self, rel: &str) -> Result<PathBuf> {
        let candidate = self.root.join(rel);
        let resolved = candidate
            .canonicalize()
            .map_err(|_| CatpackError::FileNotFound {
                path: rel.to_string(),
            })?;

        if !resolved.starts_with(&self.root) {
            return Err(CatpackError::PathTraversal {
                path: rel.to_string(),
            });
        }

        Ok(resolved)
    }

    /// Whether a relative path resolves to a file inside the tree
    pub fn contains(&self, rel: &str) -> bool {
        self.resolve(rel).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Read a file inside the tree as UTF-8 text
    pub fn read_text(&self, rel: &str) -> Result<String> {
        let path = self.resolve(rel)?;
        std::fs::read_to_string(&path).map_err(|e| CatpackError::FileReadFailed {
            path: rel.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Fetch a repository's content at a pinned commit
pub trait SourceFetcher {
    fn fetch(&self, origin: &str, commit_sha: &str) -> Result<SourceTree>;
}

/// Production fetcher: full clone plus detached checkout of the commit
#[derive(Debug, Default)]
pub struct GitFetcher;

impl SourceFetcher for GitFetcher {
    fn fetch(&self, origin: &str, commit_sha: &str) -> Result<SourceTree> {
        let checkout = TempDir::new()?;
        info!(origin, commit_sha, "fetching source repository");

        let repo = git::clone(origin, checkout.path())?;
        git::checkout_commit(&repo, commit_sha)?;

        SourceTree::from_checkout(checkout)
    }
}

/// Fixture-backed fetcher for tests: serves a local directory as the
/// "fetched" tree regardless of origin and commit
#[cfg(test)]
pub struct DirFetcher {
    pub root: PathBuf,
}

#[cfg(test)]
impl SourceFetcher for DirFetcher {
    fn fetch(&self, _origin: &str, _commit_sha: &str) -> Result<SourceTree> {
        SourceTree::from_dir(&self.root)
    }
}
