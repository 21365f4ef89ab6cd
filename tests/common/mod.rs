//! Shared helpers for integration tests.
//!
//! Tests drive the `catpack` binary against fixture git repositories and
//! catalog trees built on the fly; no network access is involved. The
//! `CATPACK_ALLOW_ANY_ORIGIN` escape hatch lets manifests point at the
//! local fixture repositories.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A complete build descriptor for the `example_app` fixture
pub const EXAMPLE_DESCRIPTOR: &str = r#"
App(
    appid="example_app",
    name="Example App",
    apptype=FlipperAppType.EXTERNAL,
    entry_point="example_app_main",
    fap_category="Tools",
    fap_version=(1, 0),
    fap_icon="icon.png",
    fap_description="Does example things",
    fap_author="Example Author",
)
"#;

/// The catpack binary with the fixture-origin escape hatch enabled
pub fn catpack_cmd() -> Command {
    let mut cmd = Command::cargo_bin("catpack").expect("catpack binary");
    cmd.env("CATPACK_ALLOW_ANY_ORIGIN", "1");
    cmd
}

/// The catpack binary with production origin restrictions
pub fn catpack_cmd_strict() -> Command {
    Command::cargo_bin("catpack").expect("catpack binary")
}

/// A fixture application source repository with one commit
pub struct SourceRepo {
    pub temp: TempDir,
    pub path: PathBuf,
    pub sha: String,
}

impl SourceRepo {
    /// Origin string for a manifest pointing at this repository
    pub fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

/// Build a source repository with the standard fixture files and the given
/// build descriptor
pub fn create_source_repo_with(descriptor: &str, readme: &str) -> SourceRepo {
    let temp = TempDir::new().expect("temp dir");
    let path = temp.path().to_path_buf();
    let repo = git2::Repository::init(&path).expect("git init");

    write_file(&path, "application.fam", descriptor.as_bytes());
    write_file(&path, "README.md", readme.as_bytes());
    write_file(&path, "CHANGELOG.md", b"Initial release\n");
    write_file(&path, "icon.png", &png_bytes(10, 10, 1, 0));
    write_file(&path, "screenshots/ss0.png", b"screenshot bytes");
    write_file(&path, "main.c", b"int main(void) { return 0; }\n");

    let sha = commit_all(&repo, "app source");
    SourceRepo { temp, path, sha }
}

/// Build the standard fixture source repository
pub fn create_source_repo() -> SourceRepo {
    create_source_repo_with(EXAMPLE_DESCRIPTOR, "# Example\n\nDoes example things.\n")
}

/// A sparse manifest pointing at the given source coordinates; required
/// identity fields come from the build descriptor
pub fn sparse_manifest_yaml(origin: &str, commit_sha: &str) -> String {
    format!(
        r#"sourcecode:
  type: git
  location:
    origin: {origin}
    commit_sha: {commit_sha}
short_description: Does example things
description: "@README.md"
changelog: "@CHANGELOG.md"
screenshots:
  - screenshots/ss0.png
"#
    )
}

/// Write a manifest file into `dir` and return its path
pub fn write_manifest(dir: &Path, yaml: &str) -> PathBuf {
    let path = dir.join("manifest.yml");
    std::fs::write(&path, yaml).expect("write manifest");
    path
}

/// Write a manifest at `applications/<category>/<app_dir>/manifest.yml`
/// under `root` and return its path
pub fn write_catalog_manifest(root: &Path, category: &str, app_dir: &str, yaml: &str) -> PathBuf {
    let dir = root.join("applications").join(category).join(app_dir);
    std::fs::create_dir_all(&dir).expect("create catalog dirs");
    write_manifest(&dir, yaml)
}

/// Stage and commit everything in a repository's working tree; returns the
/// commit SHA
pub fn commit_all(repo: &git2::Repository, message: &str) -> String {
    let sig = git2::Signature::now("Test", "test@test.com").expect("signature");
    let mut index = repo.index().expect("index");
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .expect("add_all");
    index.write().expect("index write");
    let tree_id = index.write_tree().expect("write_tree");
    let tree = repo.find_tree(tree_id).expect("find_tree");
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("commit")
        .to_string()
}

/// Minimal PNG byte stream; only the IHDR fields are meaningful
pub fn png_bytes(width: u32, height: u32, bit_depth: u8, color_type: u8) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']);
    data.extend_from_slice(&13u32.to_be_bytes());
    data.extend_from_slice(b"IHDR");
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.push(bit_depth);
    data.push(color_type);
    data.extend_from_slice(&[0, 0, 0]);
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

/// Entry names of a tar archive on disk
pub fn archive_entry_names(path: &Path) -> Vec<String> {
    let data = std::fs::read(path).expect("read archive");
    let mut ar = tar::Archive::new(&data[..]);
    ar.entries()
        .expect("entries")
        .map(|e| {
            e.expect("entry")
                .path()
                .expect("path")
                .display()
                .to_string()
        })
        .collect()
}

fn write_file(root: &Path, rel: &str, content: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, content).expect("write fixture file");
}
