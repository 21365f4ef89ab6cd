//! Cloning and commit checkout
//!
//! A catalog submission pins an exact commit, so the clone is always full:
//! shallow clones cannot check out arbitrary history.

use std::path::Path;

use git2::{Cred, CredentialType, FetchOptions, RemoteCallbacks, Repository, build::RepoBuilder};
use tracing::debug;

use super::error::interpret_git_error;
use crate::error::{CatpackError, Result};

/// Clone a git repository to a target directory
pub fn clone(url: &str, target: &Path) -> Result<Repository> {
    let mut callbacks = RemoteCallbacks::new();
    setup_auth_callbacks(&mut callbacks);

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(callbacks);

    let mut builder = RepoBuilder::new();
    builder.fetch_options(fetch_options);

    let url_to_clone = normalize_url_for_clone(url);
    debug!(url = %url_to_clone, target = %target.display(), "cloning");

    builder.clone(url_to_clone.as_ref(), target).map_err(|e| {
        let reason = interpret_git_error(&e);
        CatpackError::GitCloneFailed {
            url: url.to_string(),
            reason,
        }
    })
}

/// Check out a specific commit as a detached HEAD
pub fn checkout_commit(repo: &Repository, sha: &str) -> Result<()> {
    let oid = git2::Oid::from_str(sha).map_err(|e| CatpackError::GitCheckoutFailed {
        sha: sha.to_string(),
        reason: e.message().to_string(),
    })?;

    let commit = repo
        .find_commit(oid)
        .map_err(|e| CatpackError::GitCheckoutFailed {
            sha: sha.to_string(),
            reason: e.message().to_string(),
        })?;

    repo.set_head_detached(commit.id())
        .map_err(|e| CatpackError::GitCheckoutFailed {
            sha: sha.to_string(),
            reason: e.message().to_string(),
        })?;

    let mut checkout_builder = git2::build::CheckoutBuilder::new();
    checkout_builder.force();

    repo.checkout_head(Some(&mut checkout_builder))
        .map_err(|e| CatpackError::GitCheckoutFailed {
            sha: sha.to_string(),
            reason: e.message().to_string(),
        })?;

    Ok(())
}

/// Normalize URLs libgit2 mis-parses: SCP-style SSH (`git@host:path`)
/// becomes `ssh://git@host/path`, and bare `file://relative` paths get a
/// leading slash.
fn normalize_url_for_clone(url: &str) -> std::borrow::Cow<'_, str> {
    if url.starts_with("git@") && !url.starts_with("ssh://") {
        if let Some((host, path)) = url.split_once(':') {
            let path = path.strip_prefix('/').unwrap_or(path);
            return std::borrow::Cow::Owned(format!("ssh://{host}/{path}"));
        }
    }

    if let Some(after) = url.strip_prefix("file://") {
        if !after.is_empty() && !after.starts_with('/') {
            return std::borrow::Cow::Owned(format!("file:///{after}"));
        }
    }

    std::borrow::Cow::Borrowed(url)
}

/// Delegate authentication to git's native credential system: default
/// credentials, ssh-agent, then credential helpers. Public repositories
/// fall through to anonymous userpass.
fn setup_auth_callbacks(callbacks: &mut RemoteCallbacks<'_>) {
    callbacks.credentials(|url, username_from_url, allowed_types| {
        if allowed_types.contains(CredentialType::DEFAULT) {
            return Cred::default();
        }

        if allowed_types.contains(CredentialType::SSH_KEY) {
            if let Some(username) = username_from_url {
                if let Ok(cred) = Cred::ssh_key_from_agent(username) {
                    return Ok(cred);
                }
            }
        }

        if allowed_types.contains(CredentialType::USER_PASS_PLAINTEXT) {
            if let Ok(config) = git2::Config::open_default() {
                if let Ok(cred) = Cred::credential_helper(&config, url, username_from_url) {
                    return Ok(cred);
                }
            }

            // Anonymous access lets the server answer for public repos
            if let Ok(cred) = Cred::userpass_plaintext(username_from_url.unwrap_or("git"), "") {
                return Ok(cred);
            }
        }

        Err(git2::Error::new(
            git2::ErrorCode::Auth,
            git2::ErrorClass::Http,
            "authentication failed",
        ))
    });
}
