//! Git operations for fetching application source at a pinned commit
//!
//! This module handles:
//! - Cloning the declared origin (HTTPS, SSH, or local/file URLs)
//! - Checking out the pinned commit as a detached HEAD
//! - Interpreting libgit2 errors into user-friendly messages
//!
//! Authentication is delegated to git's native credential system (ssh-agent,
//! credential helpers). Catalog submissions point at public repositories, so
//! anonymous access is the expected path.

pub mod error;
pub mod fetch;

pub use fetch::{checkout_commit, clone};
