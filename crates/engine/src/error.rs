// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type for a worker session

use bw_adapters::{ExtractError, StrategyError};
use thiserror::Error;

use crate::cgroup::CgroupError;
use crate::config::ConfigError;
use crate::dockerfile::DockerfileError;
use crate::source::SourceError;

/// Errors that end a worker session
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to retrieve cgroup limits: {0}")]
    Limits(#[from] CgroupError),
    #[error("build error: {0}")]
    Build(#[from] StrategyError),
    #[error(transparent)]
    Dockerfile(#[from] DockerfileError),
    #[error("failed to extract image content: {0}")]
    Extract(#[from] ExtractError),
    #[error("no container engine configured for this session")]
    NoEngine,
    #[error("worker panicked: {0}")]
    Panicked(String),
}
