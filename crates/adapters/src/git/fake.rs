// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake git client for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{CloneOptions, GitClient, GitError};
use async_trait::async_trait;
use bw_core::GitSourceRevision;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded git call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Clone {
        uri: String,
        dir: PathBuf,
        opts: CloneOptions,
    },
    Checkout {
        dir: PathBuf,
        git_ref: String,
    },
    SubmoduleUpdate {
        dir: PathBuf,
    },
    SourceInfo {
        dir: PathBuf,
    },
}

#[derive(Default)]
struct FakeGitState {
    calls: Vec<GitCall>,
    files: Vec<String>,
    clone_error: Option<String>,
    source_info: GitSourceRevision,
}

/// Fake git client.
///
/// A successful clone creates the target directory plus any files
/// registered with [`FakeGit::with_files`].
#[derive(Clone, Default)]
pub struct FakeGit {
    inner: Arc<Mutex<FakeGitState>>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files (relative paths) a clone materializes
    pub fn with_files(self, files: &[&str]) -> Self {
        self.inner.lock().files = files.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Make every clone fail with `message`
    pub fn failing_clone(self, message: &str) -> Self {
        self.inner.lock().clone_error = Some(message.to_string());
        self
    }

    /// Revision returned by `source_info`
    pub fn with_source_info(self, info: GitSourceRevision) -> Self {
        self.inner.lock().source_info = info;
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl GitClient for FakeGit {
    async fn clone_repo(&self, uri: &str, dir: &Path, opts: CloneOptions) -> Result<(), GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::Clone {
            uri: uri.to_string(),
            dir: dir.to_path_buf(),
            opts,
        });
        if let Some(message) = &inner.clone_error {
            return Err(GitError::Failed(message.clone()));
        }
        std::fs::create_dir_all(dir).map_err(|e| GitError::Failed(e.to_string()))?;
        for file in &inner.files {
            let path = dir.join(file);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| GitError::Failed(e.to_string()))?;
            }
            std::fs::write(&path, b"").map_err(|e| GitError::Failed(e.to_string()))?;
        }
        Ok(())
    }

    async fn checkout(&self, dir: &Path, git_ref: &str) -> Result<(), GitError> {
        self.inner.lock().calls.push(GitCall::Checkout {
            dir: dir.to_path_buf(),
            git_ref: git_ref.to_string(),
        });
        Ok(())
    }

    async fn submodule_update(&self, dir: &Path) -> Result<(), GitError> {
        self.inner.lock().calls.push(GitCall::SubmoduleUpdate {
            dir: dir.to_path_buf(),
        });
        Ok(())
    }

    async fn source_info(&self, dir: &Path) -> Result<GitSourceRevision, GitError> {
        let mut inner = self.inner.lock();
        inner.calls.push(GitCall::SourceInfo {
            dir: dir.to_path_buf(),
        });
        Ok(inner.source_info.clone())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
