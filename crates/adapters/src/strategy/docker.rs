// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dockerfile-driven builds

use super::{build_and_push, BuildContext, BuildStrategy, StrategyError};
use async_trait::async_trait;

const DEFAULT_DOCKERFILE: &str = "Dockerfile";

/// Builds the Dockerfile found in the build context.
#[derive(Debug, Clone, Copy, Default)]
pub struct DockerStrategy;

#[async_trait]
impl BuildStrategy for DockerStrategy {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn build<'a>(&self, mut ctx: BuildContext<'a>) -> Result<(), StrategyError> {
        let options = ctx
            .build
            .spec
            .strategy
            .docker_strategy
            .clone()
            .ok_or(StrategyError::MissingOptions("docker"))?;
        let context_dir = ctx.context_dir()?;
        let dockerfile = if options.dockerfile_path.is_empty() {
            ctx.input_path(&[DEFAULT_DOCKERFILE])?
        } else {
            ctx.input_path(&[options.dockerfile_path.as_str()])?
        };
        build_and_push(
            &mut ctx,
            dockerfile,
            context_dir,
            &options.build_args,
            options.no_cache,
            options.force_pull,
        )
        .await
    }
}
