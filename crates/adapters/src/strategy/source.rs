// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source-to-image builds.
//!
//! The `s2i` tool turns the source tree and a builder image into a
//! Dockerfile plus an upload directory; the engine then builds that.

use super::{build_and_push, BuildContext, BuildStrategy, StrategyError};
use async_trait::async_trait;
use bw_core::{SourceStrategyOptions, StageName, StatusReason, StepName};
use std::path::Path;
use tokio::process::Command;

use crate::subprocess::run_checked;

/// Directory, next to the input directory, receiving the generated build
const GENERATED_DIR: &str = "s2i-build";

/// Generates a Dockerfile with `s2i` and builds it.
#[derive(Debug, Clone)]
pub struct SourceStrategy {
    program: String,
}

impl Default for SourceStrategy {
    fn default() -> Self {
        Self {
            program: "s2i".to_string(),
        }
    }
}

impl SourceStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another `s2i` executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments for generating the Dockerfile at `dockerfile`.
    pub fn generate_args(
        options: &SourceStrategyOptions,
        context_dir: &Path,
        dockerfile: &Path,
    ) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            context_dir.display().to_string(),
            options.from.name.clone(),
            "--as-dockerfile".to_string(),
            dockerfile.display().to_string(),
        ];
        if let Some(scripts) = options.scripts.as_deref().filter(|s| !s.is_empty()) {
            args.extend(["--scripts-url".to_string(), scripts.to_string()]);
        }
        if options.incremental == Some(true) {
            args.push("--incremental".to_string());
        }
        for var in &options.env {
            args.extend(["-e".to_string(), format!("{}={}", var.name, var.value)]);
        }
        args
    }
}

#[async_trait]
impl BuildStrategy for SourceStrategy {
    fn name(&self) -> &'static str {
        "source"
    }

    async fn build<'a>(&self, mut ctx: BuildContext<'a>) -> Result<(), StrategyError> {
        let options = ctx
            .build
            .spec
            .strategy
            .source_strategy
            .clone()
            .ok_or(StrategyError::MissingOptions("source"))?;

        let generated = ctx
            .input_dir
            .parent()
            .unwrap_or(ctx.input_dir)
            .join(GENERATED_DIR);
        let dockerfile = generated.join("Dockerfile");
        let context_dir = ctx.context_dir()?;
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::generate_args(&options, &context_dir, &dockerfile));

        tracing::info!(builder = %options.from.name, "generating Dockerfile");
        let result = ctx
            .timed(
                StageName::Build,
                StepName::GenerateDockerfile,
                run_checked(cmd, "s2i build"),
            )
            .await;
        if let Err(e) = result {
            ctx.build.status.fail(StatusReason::GenericBuildFailed);
            return Err(StrategyError::Generate(e));
        }

        build_and_push(
            &mut ctx,
            dockerfile,
            generated,
            &[],
            false,
            options.force_pull,
        )
        .await
    }
}
