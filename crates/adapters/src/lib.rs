// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the build worker's external collaborators

pub mod client;
mod env;
pub mod extract;
pub mod git;
pub mod status;
pub mod strategy;
pub mod subprocess;
pub mod traced;

pub use client::{DaemonEndpoint, EmbeddedStore, EngineClient, EngineError, StoreOptions};
pub use extract::{ContentExtractor, ExtractError};
pub use git::{CloneOptions, GitCli, GitClient, GitError};
pub use status::{ClusterStatusClient, InClusterConfig, ReportError, StatusReporter};
pub use strategy::{BuildContext, BuildStrategy, DockerStrategy, SourceStrategy, StrategyError};
pub use traced::{TracedGit, TracedReporter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use extract::{ExtractCall, FakeExtractor};
#[cfg(any(test, feature = "test-support"))]
pub use git::{FakeGit, GitCall};
#[cfg(any(test, feature = "test-support"))]
pub use status::FakeStatusReporter;
#[cfg(any(test, feature = "test-support"))]
pub use strategy::{FakeStrategy, StrategyCall};
