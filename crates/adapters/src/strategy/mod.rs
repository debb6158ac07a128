// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build strategies: the image-construction step a session dispatches to.

mod docker;
mod source;

pub use docker::DockerStrategy;
pub use source::SourceStrategy;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeStrategy, StrategyCall};

use async_trait::async_trait;
use bw_core::{join_within, Build, EnvVar, ResourceLimits, StageName, StatusReason, StepName, Timings};
use chrono::Utc;
use std::future::Future;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::client::{EngineClient, EngineError, ImageBuildRequest};
use crate::subprocess::SubprocessError;

/// Errors from a build strategy
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("build has no {0} strategy options")]
    MissingOptions(&'static str),
    #[error("failed to generate Dockerfile: {0}")]
    Generate(#[source] SubprocessError),
    #[error("failed to build image: {0}")]
    Build(#[source] EngineError),
    #[error("failed to push image {tag}: {source}")]
    Push {
        tag: String,
        #[source]
        source: EngineError,
    },
    #[error("{} is outside the build inputs", .0.display())]
    OutsideInputs(PathBuf),
    #[error("{0}")]
    Other(String),
}

/// Everything a strategy needs for one build.
pub struct BuildContext<'a> {
    pub client: &'a EngineClient,
    /// Descriptor whose status the strategy may mark failed
    pub build: &'a mut Build,
    pub limits: &'a ResourceLimits,
    /// Directory holding the fetched inputs
    pub input_dir: &'a Path,
    pub timings: &'a mut Timings,
}

impl BuildContext<'_> {
    /// Root of the build context inside the input directory
    pub fn context_dir(&self) -> Result<PathBuf, StrategyError> {
        self.input_path(&[])
    }

    /// `file` below the build context, kept inside the input directory
    pub fn input_path(&self, file: &[&str]) -> Result<PathBuf, StrategyError> {
        let context = self.build.spec.source.context_dir.as_str();
        let parts = std::iter::once(context).chain(file.iter().copied());
        join_within(self.input_dir, parts).ok_or_else(|| {
            let mut relative = PathBuf::from(context);
            relative.extend(file);
            StrategyError::OutsideInputs(relative)
        })
    }

    /// Tag for the built image: the output image, or a local name when the
    /// build pushes nothing.
    pub fn image_tag(&self) -> String {
        match self.build.output_image() {
            Some(image) => image.to_string(),
            None => format!(
                "temp.builder.local/{}/{}:latest",
                self.build.namespace(),
                self.build.name()
            ),
        }
    }

    /// Run `step` and record its timing under `stage`.
    pub async fn timed<T, F>(&mut self, stage: StageName, step: StepName, fut: F) -> T
    where
        F: Future<Output = T>,
    {
        let start = Utc::now();
        let result = fut.await;
        self.timings.record_step(stage, step, start, Utc::now());
        result
    }
}

/// A way of turning fetched inputs into an image.
///
/// On failure a strategy records a specific reason on the descriptor's
/// status when it knows one; the orchestrator fills in a generic reason
/// otherwise.
#[async_trait]
pub trait BuildStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn build<'a>(&self, ctx: BuildContext<'a>) -> Result<(), StrategyError>;
}

/// Engine build of `dockerfile`, followed by a push when the descriptor
/// names an output image.
pub(crate) async fn build_and_push(
    ctx: &mut BuildContext<'_>,
    dockerfile: PathBuf,
    context_dir: PathBuf,
    build_args: &[EnvVar],
    no_cache: bool,
    pull: bool,
) -> Result<(), StrategyError> {
    let tag = ctx.image_tag();
    let req = ImageBuildRequest {
        tag: &tag,
        dockerfile,
        context_dir,
        build_args,
        no_cache,
        pull,
        limits: ctx.limits,
    };
    let client = ctx.client;
    let built = ctx
        .timed(StageName::Build, StepName::DockerBuild, client.build_image(&req))
        .await;
    if let Err(e) = built {
        ctx.build.status.fail(StatusReason::DockerBuildFailed);
        return Err(StrategyError::Build(e));
    }

    if ctx.build.output_image().is_none() {
        return Ok(());
    }
    let pushed = ctx
        .timed(StageName::PushImage, StepName::PushImage, client.push_image(&tag))
        .await;
    if let Err(source) = pushed {
        ctx.build.status.fail(StatusReason::PushImageToRegistryFailed);
        return Err(StrategyError::Push { tag, source });
    }
    tracing::info!(tag = %tag, "image pushed");
    Ok(())
}

#[cfg(test)]
#[path = "strategy_tests.rs"]
mod tests;
