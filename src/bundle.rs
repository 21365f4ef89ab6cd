//! Bundle assembly: the validate-then-package pipeline
//!
//! [`Bundler::run`] drives a submission end to end: parse the manifest,
//! check the source coordinates, fetch the pinned tree, resolve fallback
//! fields and file references, run every validation rule, and only then
//! write the archive. Validation problems accumulate; the archive is
//! produced only when the report carries no fatal entry.
//!
//! The archive is deterministic (entries sorted by path, zeroed
//! timestamps and ownership, fixed modes) so re-bundling an unchanged
//! submission is verifiable by hash comparison. The output file is staged
//! through a temp file in the destination directory and atomically
//! persisted; a failed run never leaves a partial bundle behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempDir};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::catalog::{self, CatalogIndex, Placement, PlacementOutcome, PublishedState};
use crate::error::{CatpackError, Result};
use crate::hash::hash_file;
use crate::manifest::{ApplicationManifest, MANIFEST_FILE_NAME};
use crate::resolver;
use crate::source::{SourceFetcher, SourceTree};
use crate::validate::{ValidationReport, rules};

/// Permit non-github origins (fixture repositories, air-gapped CI)
pub const ALLOW_ANY_ORIGIN_ENV: &str = "CATPACK_ALLOW_ANY_ORIGIN";

/// Downgrade manifest/descriptor version conflicts to warnings
pub const ALLOW_VERSION_MISMATCH_ENV: &str = "CATPACK_ALLOW_VERSION_MISMATCH";

/// Directory inside the bundle holding the fetched source tree
const CODE_DIR: &str = "code";

/// Build-output directory excluded from the bundled source tree
const DIST_DIR: &str = "dist";

/// Behavior switches from the CLI
#[derive(Debug, Default)]
pub struct BundleOptions {
    /// Skip Markdown-subset and style linting
    pub nolint: bool,
    /// Leave the source tree out of the archive
    pub nosourcecode: bool,
    /// Also write the resolved manifest as JSON to this path
    pub json_manifest: Option<PathBuf>,
}

/// What a bundling run produced
#[derive(Debug)]
pub enum BundleOutcome {
    /// Archive written; the report may still carry warnings
    Bundled {
        hash: String,
        report: ValidationReport,
    },
    /// Fatal validation errors; nothing written
    Rejected { report: ValidationReport },
}

/// One submission, validated and packaged in a single pass
pub struct Bundler<'a> {
    manifest_path: &'a Path,
    bundle_path: &'a Path,
    options: BundleOptions,
    fetcher: &'a dyn SourceFetcher,
}

impl<'a> Bundler<'a> {
    pub fn new(
        manifest_path: &'a Path,
        bundle_path: &'a Path,
        options: BundleOptions,
        fetcher: &'a dyn SourceFetcher,
    ) -> Self {
        Self {
            manifest_path,
            bundle_path,
            options,
            fetcher,
        }
    }

    /// Validate the submission and, when clean, write the bundle archive
    pub fn run(&self) -> Result<BundleOutcome> {
        let mut manifest = ApplicationManifest::load(self.manifest_path)?;
        info!(path = %self.manifest_path.display(), "loaded manifest");

        let mut report = ValidationReport::new();
        rules::check_sourcecode(&manifest, env_flag(ALLOW_ANY_ORIGIN_ENV), &mut report);
        if report.has_fatal() {
            // Fetch is impossible without usable coordinates
            return Ok(BundleOutcome::Rejected { report });
        }

        let location = manifest.sourcecode.location.clone();
        let tree = match self.fetcher.fetch(&location.origin, &location.commit_sha) {
            Ok(tree) => tree,
            Err(e) => {
                report.fatal(fetch_error_field(&e), e.to_string());
                return Ok(BundleOutcome::Rejected { report });
            }
        };
        let tree = match tree.scoped(location.subdir.as_deref()) {
            Ok(tree) => tree,
            Err(e) => {
                report.fatal("sourcecode.location.subdir", e.to_string());
                return Ok(BundleOutcome::Rejected { report });
            }
        };

        resolver::resolve(
            &mut manifest,
            &tree,
            env_flag(ALLOW_VERSION_MISMATCH_ENV),
            &mut report,
        );

        let placement = Placement::locate(self.manifest_path);
        let (index, published) = match &placement {
            PlacementOutcome::Catalog(p) => (
                Some(CatalogIndex::scan(p, self.manifest_path)),
                catalog::published_state(self.manifest_path),
            ),
            _ => (None, PublishedState::NotPublished),
        };

        let ctx = rules::ValidationContext {
            manifest: &manifest,
            tree: &tree,
            placement: &placement,
            index: index.as_ref(),
            published: &published,
            nolint: self.options.nolint,
        };
        rules::validate(&ctx, &mut report);

        if report.has_fatal() {
            return Ok(BundleOutcome::Rejected { report });
        }

        let hash = self.write_bundle(&mut manifest, &tree)?;

        if let Some(json_path) = &self.options.json_manifest {
            std::fs::write(json_path, manifest.to_json()?).map_err(|e| {
                CatpackError::FileWriteFailed {
                    path: json_path.display().to_string(),
                    reason: e.to_string(),
                }
            })?;
            info!(path = %json_path.display(), "wrote JSON manifest");
        }

        Ok(BundleOutcome::Bundled { hash, report })
    }

    /// Stage the resolved manifest, assets, and source tree, then write the
    /// deterministic archive atomically
    fn write_bundle(&self, manifest: &mut ApplicationManifest, tree: &SourceTree) -> Result<String> {
        let stage = TempDir::new()?;
        self.stage_assets(manifest, tree, stage.path())?;

        if !self.options.nosourcecode {
            copy_source_tree(tree.root(), &stage.path().join(CODE_DIR))?;
        }

        std::fs::write(stage.path().join(MANIFEST_FILE_NAME), manifest.to_yaml()?)?;

        let data = pack_archive(stage.path())?;
        self.persist_archive(&data)?;

        let hash = hash_file(self.bundle_path)?;
        info!(path = %self.bundle_path.display(), %hash, "bundle created");
        Ok(hash)
    }

    /// Copy icon and screenshots into `assets/`, rewriting the manifest to
    /// the staged paths (screenshots renumbered in manifest order)
    fn stage_assets(
        &self,
        manifest: &mut ApplicationManifest,
        tree: &SourceTree,
        stage: &Path,
    ) -> Result<()> {
        let assets_dir = stage.join("assets");

        if !manifest.icon.is_empty() {
            std::fs::create_dir_all(&assets_dir)?;
            let src = tree.resolve(&manifest.icon)?;
            std::fs::copy(&src, assets_dir.join("icon.png"))?;
            manifest.icon = "assets/icon.png".to_string();
        }

        let screenshots_dir = assets_dir.join("screenshots");
        std::fs::create_dir_all(&screenshots_dir)?;

        let mut staged = Vec::with_capacity(manifest.screenshots.len());
        for (i, screenshot) in manifest.screenshots.iter().enumerate() {
            let src = tree.resolve(screenshot)?;
            let ext = Path::new(screenshot)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png");
            let name = format!("{i}.{ext}");
            std::fs::copy(&src, screenshots_dir.join(&name))?;
            staged.push(format!("assets/screenshots/{name}"));
        }
        manifest.screenshots = staged;

        Ok(())
    }

    /// Write archive bytes through a temp file and move into place, so a
    /// failure never leaves a partial bundle at the destination
    fn persist_archive(&self, data: &[u8]) -> Result<()> {
        let parent = self
            .bundle_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp =
            NamedTempFile::new_in(parent).map_err(|e| CatpackError::BundleWriteFailed {
                path: self.bundle_path.display().to_string(),
                reason: e.to_string(),
            })?;
        tmp.write_all(data)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CatpackError::BundleWriteFailed {
                path: self.bundle_path.display().to_string(),
                reason: e.to_string(),
            })?;
        tmp.persist(self.bundle_path)
            .map_err(|e| CatpackError::BundleWriteFailed {
                path: self.bundle_path.display().to_string(),
                reason: e.error.to_string(),
            })?;

        Ok(())
    }
}

/// Which manifest field a fetch failure concerns
fn fetch_error_field(err: &CatpackError) -> &'static str {
    match err {
        CatpackError::GitCheckoutFailed { .. } => "sourcecode.location.commit_sha",
        _ => "sourcecode.location.origin",
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Copy the fetched source tree into the stage, excluding hidden files and
/// directories (`.git` above all) and build output under `dist/`
fn copy_source_tree(source: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(target)?;

    let walker = WalkDir::new(source).min_depth(1).into_iter();
    for entry in walker.filter_entry(|e| {
        if e.depth() == 0 {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        !name.starts_with('.') && !(e.file_type().is_dir() && name == DIST_DIR)
    }) {
        let entry = entry.map_err(|e| CatpackError::BundleStageFailed {
            reason: e.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| CatpackError::BundleStageFailed {
                reason: e.to_string(),
            })?;
        let dest = target.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &dest)?;
        } else {
            debug!(path = %rel.display(), "skipping non-regular file");
        }
    }

    Ok(())
}

/// Create a deterministic tar archive of a directory.
///
/// Determinism guarantees:
/// - Entries sorted lexicographically by relative path
/// - All timestamps set to 0 (Unix epoch)
/// - All ownership set to 0:0
/// - Fixed modes: 0o644 for files, 0o755 for directories
pub fn pack_archive(root: &Path) -> Result<Vec<u8>> {
    let mut entries: Vec<(String, PathBuf, bool)> = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry.map_err(|e| CatpackError::BundleStageFailed {
            reason: e.to_string(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CatpackError::BundleStageFailed {
                reason: e.to_string(),
            })?
            .to_string_lossy()
            .into_owned();
        entries.push((rel, entry.path().to_path_buf(), entry.file_type().is_dir()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut ar = tar::Builder::new(Vec::new());
    ar.follow_symlinks(false);

    for (rel, full, is_dir) in &entries {
        if *is_dir {
            let mut header = make_header(tar::EntryType::Directory, 0o755);
            header.set_size(0);
            header.set_cksum();
            let path = format!("{rel}/");
            ar.append_data(&mut header, &path, &[] as &[u8])?;
        } else {
            let data = std::fs::read(full)?;
            let mut header = make_header(tar::EntryType::Regular, 0o644);
            header.set_size(data.len() as u64);
            header.set_cksum();
            ar.append_data(&mut header, rel, data.as_slice())?;
        }
    }

    let data = ar.into_inner()?;
    Ok(data)
}

fn make_header(entry_type: tar::EntryType, mode: u32) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode);
    header
}
