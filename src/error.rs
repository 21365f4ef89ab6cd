//! Error types and handling for catpack
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! These are the *operational* failures that abort a run (unreadable files,
//! malformed YAML, git transport errors, archive write errors). Per-field
//! validation problems are accumulated separately in
//! [`crate::validate::ValidationReport`] so the submitter gets the complete
//! picture in one pass.

use miette::Diagnostic;
use thiserror::Error;

/// Main error type for catpack operations
#[derive(Error, Diagnostic, Debug)]
pub enum CatpackError {
    // Manifest errors
    #[error("Manifest not found: {path}")]
    #[diagnostic(
        code(catpack::manifest::not_found),
        help("Check the path to manifest.yml")
    )]
    ManifestNotFound { path: String },

    #[error("Failed to read manifest: {path}")]
    #[diagnostic(code(catpack::manifest::read_failed))]
    ManifestReadFailed { path: String, reason: String },

    #[error("Failed to parse manifest: {path}")]
    #[diagnostic(
        code(catpack::manifest::parse_failed),
        help("The manifest must be valid YAML with a 'sourcecode' section")
    )]
    ManifestParseFailed { path: String, reason: String },

    // Git errors
    #[error("Failed to clone repository: {url}")]
    #[diagnostic(
        code(catpack::git::clone_failed),
        help("Check that the origin URL is correct and the repository is accessible")
    )]
    GitCloneFailed { url: String, reason: String },

    #[error("Failed to checkout commit '{sha}': {reason}")]
    #[diagnostic(
        code(catpack::git::checkout_failed),
        help("The commit must exist in the repository's history")
    )]
    GitCheckoutFailed { sha: String, reason: String },

    #[error("Git operation failed: {message}")]
    #[diagnostic(code(catpack::git::operation_failed))]
    GitOperationFailed { message: String },

    // Source tree errors
    #[error("Path escapes the fetched source tree: {path}")]
    #[diagnostic(
        code(catpack::source::path_traversal),
        help("Paths in the manifest must stay inside the repository checkout")
    )]
    PathTraversal { path: String },

    // Bundle errors
    #[error("Failed to write bundle: {path}")]
    #[diagnostic(code(catpack::bundle::write_failed))]
    BundleWriteFailed { path: String, reason: String },

    #[error("Failed to stage bundle contents: {reason}")]
    #[diagnostic(code(catpack::bundle::stage_failed))]
    BundleStageFailed { reason: String },

    // File system errors
    #[error("File not found: {path}")]
    #[diagnostic(code(catpack::fs::not_found))]
    FileNotFound { path: String },

    #[error("Failed to read file: {path}")]
    #[diagnostic(code(catpack::fs::read_failed))]
    FileReadFailed { path: String, reason: String },

    #[error("Failed to write file: {path}")]
    #[diagnostic(code(catpack::fs::write_failed))]
    FileWriteFailed { path: String, reason: String },

    #[error("IO error: {message}")]
    #[diagnostic(code(catpack::fs::io_error))]
    IoError { message: String },
}

impl From<std::io::Error> for CatpackError {
    fn from(err: std::io::Error) -> Self {
        CatpackError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<git2::Error> for CatpackError {
    fn from(err: git2::Error) -> Self {
        CatpackError::GitOperationFailed {
            message: err.to_string(),
        }
    }
}

/// Result type alias for catpack operations
pub type Result<T> = std::result::Result<T, CatpackError>;
