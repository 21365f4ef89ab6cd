//! End-to-end bundling against fixture git repositories.
//!
//! The manifest leaves `name`/`id`/`category`/`version` to the build
//! descriptor and loads `description`/`changelog` from files in the fetched
//! tree, exercising the full resolve-validate-package pipeline.

mod common;

use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_sparse_manifest_bundles_successfully() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let yaml = common::sparse_manifest_yaml(&source.origin(), &source.sha);
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .assert()
        .success()
        .stdout(predicate::str::contains("Bundle created"));

    assert!(bundle.exists());
    let names = common::archive_entry_names(&bundle);
    assert!(names.contains(&"manifest.yml".to_string()), "{names:?}");
    assert!(names.contains(&"assets/icon.png".to_string()), "{names:?}");
    assert!(
        names.contains(&"assets/screenshots/0.png".to_string()),
        "{names:?}"
    );
    assert!(names.contains(&"code/main.c".to_string()), "{names:?}");
    assert!(
        names.contains(&"code/application.fam".to_string()),
        "{names:?}"
    );
    assert!(!names.iter().any(|n| n.contains(".git")), "{names:?}");
}

#[test]
fn test_resolved_manifest_has_no_file_references() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let yaml = common::sparse_manifest_yaml(&source.origin(), &source.sha);
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .assert()
        .success();

    let data = std::fs::read(&bundle).unwrap();
    let mut ar = tar::Archive::new(&data[..]);
    let mut yaml = String::new();
    for entry in ar.entries().unwrap() {
        let mut entry = entry.unwrap();
        if entry.path().unwrap().display().to_string() == "manifest.yml" {
            use std::io::Read;
            entry.read_to_string(&mut yaml).unwrap();
        }
    }

    assert!(yaml.contains("name: Example App"), "{yaml}");
    assert!(yaml.contains("id: example_app"), "{yaml}");
    assert!(yaml.contains("version: '1.0'") || yaml.contains("version: \"1.0\""), "{yaml}");
    assert!(yaml.contains("Does example things"), "{yaml}");
    // @file markers fully materialized
    assert!(!yaml.contains("'@"), "{yaml}");
    assert!(!yaml.contains("\"@"), "{yaml}");
    assert!(yaml.contains("Initial release"), "{yaml}");
}

#[test]
fn test_bundling_twice_is_byte_identical() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let yaml = common::sparse_manifest_yaml(&source.origin(), &source.sha);
    let manifest = common::write_manifest(workdir.path(), &yaml);

    let first = workdir.path().join("first.tar");
    let second = workdir.path().join("second.tar");
    for bundle in [&first, &second] {
        common::catpack_cmd()
            .arg(&manifest)
            .arg(bundle)
            .assert()
            .success();
    }

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap(),
        "re-bundling an unchanged submission must be byte-identical"
    );
}

#[test]
fn test_nosourcecode_omits_code_directory() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let yaml = common::sparse_manifest_yaml(&source.origin(), &source.sha);
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .arg("--nosourcecode")
        .assert()
        .success();

    let names = common::archive_entry_names(&bundle);
    assert!(!names.iter().any(|n| n.starts_with("code/")), "{names:?}");
    assert!(names.contains(&"manifest.yml".to_string()));
    assert!(names.contains(&"assets/icon.png".to_string()));
}

#[test]
fn test_json_manifest_sidecar() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let yaml = common::sparse_manifest_yaml(&source.origin(), &source.sha);
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");
    let json_path = workdir.path().join("manifest.json");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .arg("--json-manifest")
        .arg(&json_path)
        .assert()
        .success();

    let json = std::fs::read_to_string(&json_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["id"], "example_app");
    assert_eq!(value["name"], "Example App");
    assert_eq!(value["category"], "Tools");
    assert!(!value["description"].as_str().unwrap().starts_with('@'));
}

#[test]
fn test_failed_validation_leaves_no_partial_bundle() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let mut yaml = common::sparse_manifest_yaml(&source.origin(), &source.sha);
    yaml = yaml.replace("screenshots/ss0.png", "screenshots/missing.png");
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("screenshots[0]"))
        .stderr(predicate::str::contains("no bundle written"));

    assert!(!bundle.exists());
    // No stray temp files left next to the destination either
    let leftovers: Vec<_> = std::fs::read_dir(workdir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n != "manifest.yml")
        .collect();
    assert!(leftovers.is_empty(), "leftovers: {leftovers:?}");
}

#[test]
fn test_subdir_scoped_source() {
    // Application lives under apps/example inside the repository
    let temp = TempDir::new().unwrap();
    let repo = git2::Repository::init(temp.path()).unwrap();
    let app_dir = temp.path().join("apps/example");
    std::fs::create_dir_all(&app_dir).unwrap();
    std::fs::write(app_dir.join("application.fam"), common::EXAMPLE_DESCRIPTOR).unwrap();
    std::fs::write(app_dir.join("README.md"), "# Example\n").unwrap();
    std::fs::write(app_dir.join("CHANGELOG.md"), "Initial release\n").unwrap();
    std::fs::write(app_dir.join("icon.png"), common::png_bytes(10, 10, 1, 0)).unwrap();
    std::fs::create_dir_all(app_dir.join("screenshots")).unwrap();
    std::fs::write(app_dir.join("screenshots/ss0.png"), b"shot").unwrap();
    let sha = common::commit_all(&repo, "monorepo");

    let workdir = TempDir::new().unwrap();
    let yaml = format!(
        r#"sourcecode:
  type: git
  location:
    origin: {}
    commit_sha: {sha}
    subdir: apps/example
short_description: Does example things
description: "@README.md"
changelog: "@CHANGELOG.md"
screenshots:
  - screenshots/ss0.png
"#,
        temp.path().display()
    );
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .assert()
        .success();

    let names = common::archive_entry_names(&bundle);
    assert!(
        names.contains(&"code/application.fam".to_string()),
        "code/ must be rooted at the subdir: {names:?}"
    );
    assert!(!names.iter().any(|n| n.contains("apps/example")), "{names:?}");
}

#[test]
fn test_escaping_subdir_rejected() {
    let source = common::create_source_repo();
    let workdir = TempDir::new().unwrap();
    let yaml = format!(
        r#"sourcecode:
  type: git
  location:
    origin: {}
    commit_sha: {}
    subdir: ../..
short_description: Short
description: text
changelog: text
screenshots:
  - screenshots/ss0.png
"#,
        source.origin(),
        source.sha
    );
    let manifest = common::write_manifest(workdir.path(), &yaml);
    let bundle = workdir.path().join("bundle.tar");

    common::catpack_cmd()
        .arg(&manifest)
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("sourcecode.location.subdir"));
    assert!(!bundle.exists());
}
