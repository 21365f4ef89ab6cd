//! Field resolution: descriptor fallback merge and `@file` includes
//!
//! Resolution turns a parsed manifest into a fully materialized one:
//!
//! 1. The build descriptor in the fetched source tree supplies values for
//!    fields the manifest left empty. Precedence is an explicit two-source
//!    lookup: the manifest wins, the descriptor is fallback. For the
//!    identity fields (`name`, `id`, `version`) a conflicting non-empty
//!    value on both sides is fatal; for the rest the manifest value wins
//!    with a warning.
//! 2. `@path` values for `changelog` and `description` are replaced with
//!    the referenced file's text content.
//!
//! Problems accumulate in the shared report; the manifest is only mutated
//! with values that resolved cleanly.

use tracing::debug;

use crate::descriptor::{BuildDescriptor, DescriptorApp, SelectError};
use crate::error::CatpackError;
use crate::manifest::ApplicationManifest;
use crate::source::SourceTree;
use crate::validate::ValidationReport;

/// File name of the build descriptor inside the application's source tree
pub const DESCRIPTOR_FILE_NAME: &str = "application.fam";

/// Fields that may carry `@file` references
const FILE_REF_FIELDS: &[&str] = &["changelog", "description"];

/// Merge descriptor fallbacks and resolve file references, in place
pub fn resolve(
    manifest: &mut ApplicationManifest,
    tree: &SourceTree,
    allow_version_mismatch: bool,
    report: &mut ValidationReport,
) {
    if let Some(descriptor) = load_descriptor(tree, report) {
        if let Some(app) = select_app(&descriptor, manifest, report) {
            merge_from_descriptor(manifest, app, allow_version_mismatch, report);
        }
    }

    resolve_includes(manifest, tree, report);
}

fn load_descriptor(tree: &SourceTree, report: &mut ValidationReport) -> Option<BuildDescriptor> {
    let text = match tree.read_text(DESCRIPTOR_FILE_NAME) {
        Ok(text) => text,
        Err(CatpackError::FileNotFound { .. }) => {
            report.fatal(
                DESCRIPTOR_FILE_NAME,
                "build descriptor not found in the source tree",
            );
            return None;
        }
        Err(e) => {
            report.fatal(DESCRIPTOR_FILE_NAME, e.to_string());
            return None;
        }
    };

    match BuildDescriptor::parse(&text) {
        Ok(descriptor) => Some(descriptor),
        Err(reason) => {
            report.fatal(DESCRIPTOR_FILE_NAME, reason);
            None
        }
    }
}

fn select_app<'a>(
    descriptor: &'a BuildDescriptor,
    manifest: &ApplicationManifest,
    report: &mut ValidationReport,
) -> Option<&'a DescriptorApp> {
    match descriptor.select(&manifest.id) {
        Ok(app) => Some(app),
        Err(SelectError::NoExternalApps) => {
            report.fatal(
                DESCRIPTOR_FILE_NAME,
                "no external applications declared in the build descriptor",
            );
            None
        }
        Err(SelectError::NoMatch { candidates }) => {
            report.fatal(
                "id",
                format!(
                    "build descriptor declares several external applications ({}); set 'id' to choose one",
                    candidates.join(", ")
                ),
            );
            None
        }
    }
}

fn merge_from_descriptor(
    manifest: &mut ApplicationManifest,
    app: &DescriptorApp,
    allow_version_mismatch: bool,
    report: &mut ValidationReport,
) {
    let fam_version = app.version_string().unwrap_or_default();

    // (manifest field, descriptor field, manifest value, descriptor value,
    //  conflicting values are fatal)
    let string_fields: [(&str, &str, &mut String, &str, bool); 7] = [
        ("name", "name", &mut manifest.name, &app.name, true),
        ("id", "appid", &mut manifest.id, &app.appid, true),
        (
            "author",
            "fap_author",
            &mut manifest.author,
            &app.fap_author,
            false,
        ),
        (
            "category",
            "fap_category",
            &mut manifest.category,
            &app.fap_category,
            false,
        ),
        (
            "icon",
            "fap_icon",
            &mut manifest.icon,
            &app.fap_icon,
            false,
        ),
        (
            "short_description",
            "fap_description",
            &mut manifest.short_description,
            &app.fap_description,
            false,
        ),
        (
            "version",
            "fap_version",
            &mut manifest.version,
            &fam_version,
            !allow_version_mismatch,
        ),
    ];

    for (field, fam_field, value, fam_value, must_match) in string_fields {
        merge_string_field(field, fam_field, value, fam_value, must_match, report);
    }

    if manifest.targets.is_empty() && !app.targets.is_empty() {
        debug!(field = "targets", "filling from build descriptor");
        manifest.targets = app.targets.clone();
    } else if !manifest.targets.is_empty()
        && !app.targets.is_empty()
        && manifest.targets != app.targets
    {
        report.warning(
            "targets",
            format!(
                "manifest value '{}' differs from application.fam targets '{}'; using the manifest value",
                manifest.targets.join(","),
                app.targets.join(",")
            ),
        );
    }
}

fn merge_string_field(
    field: &str,
    fam_field: &str,
    value: &mut String,
    fam_value: &str,
    must_match: bool,
    report: &mut ValidationReport,
) {
    if !value.is_empty() && !fam_value.is_empty() && value.as_str() != fam_value {
        let message = format!(
            "manifest value '{value}' differs from application.fam {fam_field} '{fam_value}'"
        );
        if must_match {
            report.fatal(field, message);
        } else {
            report.warning(field, format!("{message}; using the manifest value"));
        }
        return;
    }

    if value.is_empty() && !fam_value.is_empty() {
        debug!(field, fam_field, "filling from build descriptor");
        *value = fam_value.to_string();
    }
}

fn resolve_includes(
    manifest: &mut ApplicationManifest,
    tree: &SourceTree,
    report: &mut ValidationReport,
) {
    for field in FILE_REF_FIELDS {
        let value = match *field {
            "changelog" => &mut manifest.changelog,
            _ => &mut manifest.description,
        };
        if !ApplicationManifest::is_file_ref(value) {
            continue;
        }

        let rel = value[1..].to_string();
        match tree.read_text(&rel) {
            Ok(text) => {
                debug!(field, path = %rel, "including field content from file");
                *value = text;
            }
            Err(CatpackError::PathTraversal { .. }) => {
                report.fatal(
                    *field,
                    format!("referenced file '{rel}' escapes the source tree"),
                );
            }
            Err(_) => {
                report.fatal(
                    *field,
                    format!("referenced file '{rel}' not found in the source tree"),
                );
            }
        }
    }
}
