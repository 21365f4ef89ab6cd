//! catpack - catalog manifest validator and bundler
//!
//! Validates application catalog submissions (manifest.yml) and packages
//! them into deterministic bundle archives. All validation errors are
//! collected and reported together; a bundle is only written when the
//! submission is clean.

use clap::Parser;

mod bundle;
mod catalog;
mod cli;
mod descriptor;
mod error;
mod git;
mod hash;
mod manifest;
mod resolver;
mod source;
mod validate;

#[cfg(test)]
mod test_fixtures;

use bundle::{BundleOptions, BundleOutcome, Bundler};
use cli::Cli;
use source::GitFetcher;
use validate::ValidationReport;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let options = BundleOptions {
        nolint: cli.nolint,
        nosourcecode: cli.nosourcecode,
        json_manifest: cli.json_manifest.clone(),
    };
    let fetcher = GitFetcher;
    let bundler = Bundler::new(&cli.manifest_path, &cli.bundle_path, options, &fetcher);

    match bundler.run() {
        Ok(BundleOutcome::Bundled { hash, report }) => {
            if !report.is_empty() {
                print_report(&report);
            }
            println!("Bundle created: {} ({hash})", cli.bundle_path.display());
        }
        Ok(BundleOutcome::Rejected { report }) => {
            print_report(&report);
            eprintln!(
                "Validation failed with {} error(s); no bundle written",
                report.fatal_count()
            );
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

fn print_report(report: &ValidationReport) {
    for error in report.iter() {
        eprintln!("{error}");
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CATPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
