//! Field and semantic constraint checks
//!
//! Every rule runs and records into the shared [`ValidationReport`]; nothing
//! short-circuits. The validator itself is pure: ambient switches (the
//! origin escape hatch for fixture repositories) are passed in as flags by
//! the caller.

use crate::catalog::{CatalogIndex, Placement, PlacementOutcome, PublishedState};
use crate::manifest::{ApplicationManifest, MANIFEST_FILE_NAME, Version};
use crate::source::SourceTree;
use crate::validate::{ValidationReport, icon, markdown};

/// The catalog's fixed category set
pub const CATEGORIES: &[&str] = &[
    "Bluetooth",
    "Games",
    "GPIO",
    "Infrared",
    "iButton",
    "Media",
    "NFC",
    "RFID",
    "Sub-GHz",
    "Tools",
    "USB",
];

/// Length of a full commit hash
pub const COMMIT_SHA_LEN: usize = 40;

/// Conditionally required manifest fields and their build-descriptor
/// equivalents
const REQUIRED_WITH_FALLBACK: &[(&str, &str)] = &[
    ("name", "name"),
    ("id", "appid"),
    ("category", "fap_category"),
    ("version", "fap_version"),
];

/// Everything the post-resolution validation pass needs to see
pub struct ValidationContext<'a> {
    pub manifest: &'a ApplicationManifest,
    pub tree: &'a SourceTree,
    pub placement: &'a PlacementOutcome,
    pub index: Option<&'a CatalogIndex>,
    pub published: &'a PublishedState,
    /// Skip Markdown-subset and style linting
    pub nolint: bool,
}

/// Pre-fetch checks: the source coordinates must be usable before any
/// network access happens
pub fn check_sourcecode(
    manifest: &ApplicationManifest,
    allow_any_origin: bool,
    report: &mut ValidationReport,
) {
    let code = &manifest.sourcecode;
    if code.kind != "git" {
        report.fatal(
            "sourcecode.type",
            format!("unsupported sourcecode type '{}'; only 'git' is supported", code.kind),
        );
    }

    let origin = &code.location.origin;
    if origin.is_empty() {
        report.fatal("sourcecode.location.origin", "origin is not specified");
    } else if !allow_any_origin && !is_github_origin(origin) {
        report.fatal(
            "sourcecode.location.origin",
            format!("'{origin}' is not a https://github.com/<owner>/<repo> repository URL"),
        );
    }

    let sha = &code.location.commit_sha;
    if sha.is_empty() {
        report.fatal("sourcecode.location.commit_sha", "commit SHA is not specified");
    } else if sha.len() != COMMIT_SHA_LEN || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
        report.fatal(
            "sourcecode.location.commit_sha",
            format!("'{sha}' is not a full-length {COMMIT_SHA_LEN}-character hexadecimal commit hash"),
        );
    }
}

fn is_github_origin(origin: &str) -> bool {
    let Some(rest) = origin.strip_prefix("https://github.com/") else {
        return false;
    };
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let segments: Vec<&str> = rest.split('/').collect();
    segments.len() == 2
        && segments.iter().all(|s| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
        })
}

/// Run every post-resolution rule
pub fn validate(ctx: &ValidationContext<'_>, report: &mut ValidationReport) {
    check_required(ctx.manifest, report);
    check_id_format(ctx.manifest, report);
    let version = check_version_format(ctx.manifest, report);
    check_placement(ctx.manifest, ctx.placement, report);

    if let PlacementOutcome::Catalog(placement) = ctx.placement {
        check_catalog(ctx.manifest, placement, ctx.index, ctx.published, version, report);
    }

    check_assets(ctx.manifest, ctx.tree, report);

    if !ctx.nolint {
        check_markdown_fields(ctx.manifest, report);
        check_lints(ctx.manifest, report);
    }
}

/// Required fields must be non-empty after the descriptor merge
fn check_required(manifest: &ApplicationManifest, report: &mut ValidationReport) {
    for (field, fam_field) in REQUIRED_WITH_FALLBACK {
        let value = match *field {
            "name" => &manifest.name,
            "id" => &manifest.id,
            "category" => &manifest.category,
            _ => &manifest.version,
        };
        if value.is_empty() {
            report.fatal(
                *field,
                format!("missing from both the manifest and application.fam ({fam_field})"),
            );
        }
    }

    for (field, value) in [
        ("changelog", &manifest.changelog),
        ("short_description", &manifest.short_description),
        ("description", &manifest.description),
    ] {
        if value.is_empty() {
            report.fatal(field, "is empty");
        }
    }

    if manifest.screenshots.is_empty() {
        report.fatal("screenshots", "at least one screenshot is required");
    }
}

fn check_id_format(manifest: &ApplicationManifest, report: &mut ValidationReport) {
    let id = &manifest.id;
    if id.is_empty() {
        return; // already reported as missing
    }
    let valid = id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        report.fatal(
            "id",
            format!("'{id}' does not match ^[a-z0-9_]+$ (lowercase, no whitespace)"),
        );
    }
}

fn check_version_format(
    manifest: &ApplicationManifest,
    report: &mut ValidationReport,
) -> Option<Version> {
    if manifest.version.is_empty() {
        return None; // already reported as missing
    }
    match manifest.version.parse() {
        Ok(version) => Some(version),
        Err(()) => {
            report.fatal(
                "version",
                format!(
                    "'{}' must be of the form <major>.<minor> (e.g. 1.0)",
                    manifest.version
                ),
            );
            None
        }
    }
}

fn check_placement(
    manifest: &ApplicationManifest,
    outcome: &PlacementOutcome,
    report: &mut ValidationReport,
) {
    if !manifest.category.is_empty() && !CATEGORIES.contains(&manifest.category.as_str()) {
        report.fatal(
            "category",
            format!(
                "unknown category '{}'; expected one of: {}",
                manifest.category,
                CATEGORIES.join(", ")
            ),
        );
    }

    match outcome {
        PlacementOutcome::Standalone => {}
        PlacementOutcome::Invalid { reason } => {
            report.fatal("manifest path", reason.clone());
        }
        PlacementOutcome::Catalog(placement) => {
            if placement.file_name != MANIFEST_FILE_NAME {
                report.fatal(
                    "manifest path",
                    format!(
                        "manifest file must be named '{MANIFEST_FILE_NAME}', got '{}'",
                        placement.file_name
                    ),
                );
            }
            if !manifest.category.is_empty() && manifest.category != placement.category {
                report.fatal(
                    "category",
                    format!(
                        "manifest says '{}' but the manifest sits under '{}'",
                        manifest.category, placement.category
                    ),
                );
            }
            if !manifest.id.is_empty() && manifest.id != placement.app_dir {
                report.fatal(
                    "id",
                    format!(
                        "manifest says '{}' but the application directory is '{}'",
                        manifest.id, placement.app_dir
                    ),
                );
            }
        }
    }
}

fn check_catalog(
    manifest: &ApplicationManifest,
    placement: &Placement,
    index: Option<&CatalogIndex>,
    published: &PublishedState,
    version: Option<Version>,
    report: &mut ValidationReport,
) {
    if let Some(index) = index {
        if !manifest.id.is_empty() {
            if let Some(dup) = index.find_duplicate(&manifest.id, &placement.app_dir) {
                report.fatal(
                    "id",
                    format!(
                        "'{}' is already used by applications/{}/{}",
                        manifest.id, dup.category, dup.app_dir
                    ),
                );
            }
        }
    }

    if let (
        Some(version),
        PublishedState::Published {
            version: Some(published_version),
            identical: false,
        },
    ) = (version, published)
    {
        if version <= *published_version {
            report.fatal(
                "version",
                format!(
                    "'{version}' must be strictly greater than the published version '{published_version}'"
                ),
            );
        }
    }
}

fn check_assets(
    manifest: &ApplicationManifest,
    tree: &SourceTree,
    report: &mut ValidationReport,
) {
    for (i, screenshot) in manifest.screenshots.iter().enumerate() {
        if !tree.contains(screenshot) {
            report.fatal(
                format!("screenshots[{i}]"),
                format!("file '{screenshot}' not found in the source tree"),
            );
        }
    }

    if manifest.icon.is_empty() {
        return;
    }
    match tree.resolve(&manifest.icon).and_then(|path| {
        std::fs::read(&path).map_err(|e| crate::error::CatpackError::FileReadFailed {
            path: manifest.icon.clone(),
            reason: e.to_string(),
        })
    }) {
        Ok(data) => {
            if let Err(problem) = icon::check_icon(&data) {
                report.fatal("icon", format!("'{}': {problem}", manifest.icon));
            }
        }
        Err(_) => {
            report.fatal(
                "icon",
                format!("file '{}' not found in the source tree", manifest.icon),
            );
        }
    }
}

fn check_markdown_fields(manifest: &ApplicationManifest, report: &mut ValidationReport) {
    for (field, text) in [
        ("description", &manifest.description),
        ("changelog", &manifest.changelog),
    ] {
        for issue in markdown::check(text) {
            report.fatal(
                field,
                format!(
                    "disallowed Markdown construct '{}' at line {}",
                    issue.construct, issue.line
                ),
            );
        }
    }
}

fn check_lints(manifest: &ApplicationManifest, report: &mut ValidationReport) {
    if manifest.author.is_empty() {
        report.warning("author", "author is empty; consider crediting the application author");
    }
    if manifest.short_description.chars().count() > 100 {
        report.warning(
            "short_description",
            "longer than 100 characters; it will be truncated in list views",
        );
    }
}
