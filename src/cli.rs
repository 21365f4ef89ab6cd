//! CLI definitions using clap derive API

use clap::Parser;
use clap::builder::{Styles, styling::AnsiColor};
use std::path::PathBuf;

/// catpack - catalog manifest validator and bundler
///
/// Validates an application catalog submission (manifest.yml) and packages
/// it into a deterministic bundle archive.
#[derive(Parser, Debug)]
#[command(
    name = "catpack",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Catalog manifest validator and bundler",
    long_about = "catpack validates an application catalog submission: it fetches the declared \
                  source repository at its pinned commit, fills missing manifest fields from the \
                  application's build descriptor, resolves @file references, checks every \
                  catalog constraint, and packages the result into a deterministic bundle \
                  archive. All validation errors are collected and reported together.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n    \
                  catpack applications/Tools/example_app/manifest.yml bundle.tar\n    \
                  catpack manifest.yml bundle.tar --nolint\n    \
                  catpack manifest.yml bundle.tar --json-manifest manifest.json\n    \
                  catpack manifest.yml bundle.tar --nosourcecode"
)]
pub struct Cli {
    /// Path to the manifest file to validate and bundle
    pub manifest_path: PathBuf,

    /// Destination path for the produced bundle archive
    pub bundle_path: PathBuf,

    /// Skip Markdown-subset and style linting (structural validation still
    /// applies)
    #[arg(long)]
    pub nolint: bool,

    /// Leave the application source code out of the bundle
    #[arg(long)]
    pub nosourcecode: bool,

    /// File to write an extra copy of the resolved manifest to, as JSON
    #[arg(long = "json-manifest", value_name = "PATH")]
    pub json_manifest: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'd')]
    pub debug: bool,
}
