// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::git::{CloneOptions, GitClient, GitError};
use crate::status::{ReportError, StatusReporter};
use async_trait::async_trait;
use bw_core::redact::safe_for_logging_url;
use bw_core::{Build, GitSourceRevision};
use std::path::Path;
use tracing::Instrument;

/// Wrapper that adds tracing to any GitClient
#[derive(Clone)]
pub struct TracedGit<G> {
    inner: G,
}

impl<G> TracedGit<G> {
    pub fn new(inner: G) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<G: GitClient> GitClient for TracedGit<G> {
    async fn clone_repo(&self, uri: &str, dir: &Path, opts: CloneOptions) -> Result<(), GitError> {
        let safe_uri = safe_for_logging_url(uri).unwrap_or_default();
        async {
            tracing::info!(shallow = opts.shallow, recursive = opts.recursive, "cloning");
            let start = std::time::Instant::now();
            let result = self.inner.clone_repo(uri, dir, opts).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "cloned"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "clone failed"),
            }
            result
        }
        .instrument(tracing::info_span!("git.clone", uri = %safe_uri, dir = %dir.display()))
        .await
    }

    async fn checkout(&self, dir: &Path, git_ref: &str) -> Result<(), GitError> {
        let result = self.inner.checkout(dir, git_ref).await;
        tracing::info_span!("git.checkout", git_ref).in_scope(|| match &result {
            Ok(()) => tracing::info!("checked out"),
            Err(e) => tracing::error!(error = %e, "checkout failed"),
        });
        result
    }

    async fn submodule_update(&self, dir: &Path) -> Result<(), GitError> {
        let result = self.inner.submodule_update(dir).await;
        if let Err(ref e) = result {
            tracing::error!(dir = %dir.display(), error = %e, "submodule update failed");
        }
        result
    }

    async fn source_info(&self, dir: &Path) -> Result<GitSourceRevision, GitError> {
        let result = self.inner.source_info(dir).await;
        match &result {
            Ok(info) => tracing::debug!(commit = %info.commit, "resolved source revision"),
            Err(e) => tracing::warn!(error = %e, "unable to read source revision"),
        }
        result
    }
}

/// Wrapper that adds tracing to any StatusReporter
#[derive(Clone)]
pub struct TracedReporter<R> {
    inner: R,
}

impl<R> TracedReporter<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: StatusReporter> StatusReporter for TracedReporter<R> {
    async fn update_details(&self, build: &Build) -> Result<(), ReportError> {
        let span = tracing::info_span!(
            "status.update",
            build = build.name(),
            namespace = build.namespace()
        );
        async {
            let start = std::time::Instant::now();
            let result = self.inner.update_details(build).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(()) => tracing::info!(
                    phase = %build.status.phase,
                    reason = build.status.reason.as_ref().map(|r| r.as_str()).unwrap_or(""),
                    stages = build.status.stages.len(),
                    elapsed_ms,
                    "status reported"
                ),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "status report failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
