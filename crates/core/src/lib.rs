// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! bw-core: build descriptor model and pure helpers for the build worker

pub mod build;
pub mod env;
pub mod limits;
pub mod paths;
pub mod redact;
pub mod status;
pub mod timing;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use build::{
    BinaryBuildSource, Build, BuildOutput, BuildSource, BuildSpec, BuildStrategySpec,
    DescriptorError, DockerStrategyOptions, EnvVar, GitBuildSource, GitSourceRevision,
    ImageSource, ImageSourcePath, ObjectMeta, ObjectReference, SecretRef, SourceControlUser,
    SourceRevision, SourceStrategyOptions,
};
pub use env::{env_name, merge_env};
pub use limits::{ContainerIdentity, Limit, ResourceLimits};
pub use paths::join_within;
pub use status::{BuildPhase, BuildStatus, StatusReason};
pub use timing::{StageInfo, StageName, StepInfo, StepName, Timings};
