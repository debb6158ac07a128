// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Git client adapters

mod cli;

pub use cli::GitCli;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeGit, GitCall};

use async_trait::async_trait;
use bw_core::{GitSourceRevision, SourceControlUser};
use std::path::Path;
use thiserror::Error;

use crate::subprocess::SubprocessError;

/// Errors from git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Command(#[from] SubprocessError),
    #[error("unexpected git log output: {0:?}")]
    MalformedLog(String),
    #[error("{0}")]
    Failed(String),
}

/// How a repository is cloned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Fetch only the tip commit
    pub shallow: bool,
    /// Clone submodules along with the repository
    pub recursive: bool,
}

/// Adapter for an external git client.
///
/// Every operation runs with the environment the client was built with and
/// nothing else.
#[async_trait]
pub trait GitClient: Clone + Send + Sync + 'static {
    /// Clone `uri` into `dir`
    async fn clone_repo(&self, uri: &str, dir: &Path, opts: CloneOptions) -> Result<(), GitError>;

    /// Check out `git_ref` in an existing clone
    async fn checkout(&self, dir: &Path, git_ref: &str) -> Result<(), GitError>;

    /// Initialize and update submodules recursively
    async fn submodule_update(&self, dir: &Path) -> Result<(), GitError>;

    /// Describe the commit currently checked out in `dir`
    async fn source_info(&self, dir: &Path) -> Result<GitSourceRevision, GitError>;
}

/// Field separator used in the `git log` format below
const LOG_SEPARATOR: char = '\u{1f}';

/// `git log` pretty format matching [`parse_source_info`]
pub(crate) const SOURCE_INFO_FORMAT: &str = "--pretty=format:%H%x1f%an%x1f%ae%x1f%cn%x1f%ce%x1f%B";

/// Parse the output of `git log -1` with [`SOURCE_INFO_FORMAT`].
pub fn parse_source_info(output: &str) -> Result<GitSourceRevision, GitError> {
    let fields: Vec<&str> = output.splitn(6, LOG_SEPARATOR).collect();
    let [commit, author_name, author_email, committer_name, committer_email, message] =
        fields.as_slice()
    else {
        return Err(GitError::MalformedLog(output.to_string()));
    };
    if commit.trim().is_empty() {
        return Err(GitError::MalformedLog(output.to_string()));
    }
    Ok(GitSourceRevision {
        commit: commit.trim().to_string(),
        author: SourceControlUser {
            name: author_name.to_string(),
            email: author_email.to_string(),
        },
        committer: SourceControlUser {
            name: committer_name.to_string(),
            email: committer_email.to_string(),
        },
        message: message.trim_end().to_string(),
    })
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
