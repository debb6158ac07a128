// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build status reporting to the cluster control plane

mod cluster;

pub use cluster::{ClusterStatusClient, InClusterConfig, SERVICE_ACCOUNT_DIR};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeStatusReporter;

use async_trait::async_trait;
use bw_core::Build;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from status reporting
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("not running in a cluster: {0} is not set")]
    NotInCluster(&'static str),
    #[error("cannot read service account credentials {path}: {reason}")]
    Credentials { path: PathBuf, reason: String },
    #[error("status request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status update rejected with {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("{0}")]
    Failed(String),
}

/// Adapter for publishing a build's status details.
#[async_trait]
pub trait StatusReporter: Clone + Send + Sync + 'static {
    /// Send the descriptor's current status, revision and timing stages
    async fn update_details(&self, build: &Build) -> Result<(), ReportError>;
}
