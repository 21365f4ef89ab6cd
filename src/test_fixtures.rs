//! Test fixtures and utilities for reducing test setup duplication.
//!
//! Most tests need one of two environments: a git repository holding an
//! application's source tree (descriptor, readme, assets), or a catalog
//! tree with manifests at `applications/<category>/<id>/manifest.yml`.
//! These helpers build both with a single call.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A build descriptor matching [`app_manifest_yaml`]'s application
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

/// Create a temp directory.
///
/// # Panics
///
/// Panics if the temp directory cannot be created.
#[must_use]
pub fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a temp directory with a git repository initialized.
///
/// Returns the `TempDir` (which cleans up on drop) and the path to the repo.
///
/// # Panics
///
/// Panics if the temp directory or git repository cannot be created.
#[must_use]
pub fn create_git_repo() -> (TempDir, PathBuf) {
    let temp = create_temp_dir();
    let path = temp.path().to_path_buf();
    git2::Repository::init(&path).expect("Failed to init git repository");
    (temp, path)
}

/// Stage everything in the repository's working tree and commit it.
/// Returns the new commit's full SHA.
///
/// # Panics
///
/// Panics if any git operation fails.
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

/// Populate a directory with a complete application source tree: build
/// descriptor, readme, changelog, a valid 10x10 1-bit icon, one
/// screenshot, and a source file.
///
/// # Panics
///
/// Panics if any file cannot be created.
pub fn create_app_source(dir: &Path) {
    let write = |rel: &str, content: &[u8]| {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&path, content).expect("Failed to write fixture file");
    };

    write("application.fam", EXAMPLE_DESCRIPTOR.as_bytes());
    write("README.md", b"# Example\n\nDoes example things.\n");
    write("CHANGELOG.md", b"Initial release\n");
    write(
        "icon.png",
        &crate::validate::icon::png_bytes(10, 10, 1, 0),
    );
    write("screenshots/ss0.png", b"screenshot bytes");
    write("main.c", b"int main(void) { return 0; }\n");
}

/// A sparse manifest (all conditionally required fields left to the build
/// descriptor) pointing at the given source coordinates
#[must_use]
pub fn app_manifest_yaml(origin: &str, commit_sha: &str) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_git_repo() {
        let (temp, path) = create_git_repo();
        assert!(path.join(".git").exists());
        assert!(temp.path().exists());
    }

    #[test]
    fn test_commit_all_returns_full_sha() {
        let (temp, _path) = create_git_repo();
        let repo = git2::Repository::open(temp.path()).unwrap();
        std::fs::write(temp.path().join("file.txt"), "content").unwrap();

        let sha = commit_all(&repo, "initial");
        assert_eq!(sha.len(), 40);
        assert!(sha.chars().all(|c| c.is_ascii_hexdigit()));

        std::fs::write(temp.path().join("other.txt"), "more").unwrap();
        let second = commit_all(&repo, "second");
        assert_ne!(sha, second);
    }

    #[test]
    fn test_create_app_source_is_complete() {
        let temp = create_temp_dir();
        create_app_source(temp.path());

        for rel in [
            "application.fam",
            "README.md",
            "CHANGELOG.md",
            "icon.png",
            "screenshots/ss0.png",
            "main.c",
        ] {
            assert!(temp.path().join(rel).exists(), "missing {rel}");
        }
    }

    #[test]
    fn test_app_manifest_yaml_parses() {
        let yaml = app_manifest_yaml("https://github.com/example/app.git", &"a".repeat(40));
        let manifest = crate::manifest::ApplicationManifest::from_yaml(&yaml).unwrap();
        assert_eq!(
            manifest.sourcecode.location.origin,
            "https://github.com/example/app.git"
        );
        assert!(manifest.id.is_empty());
    }
}
