// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build orchestration: one entry point per invocation kind.
//!
//! Every entry point ends in [`Orchestrator::finalize`], which flushes the
//! recorded timings into the descriptor and sends exactly one status
//! report, whatever the outcome. A panic inside a phase is caught and
//! reported as that phase's failure.

use bw_adapters::{BuildContext, BuildStrategy, ContentExtractor, GitClient, StatusReporter};
use bw_core::timing::append_stage_and_step_info;
use bw_core::{Build, SourceRevision, StageName, StatusReason, StepName, Timings};
use chrono::Utc;
use std::any::Any;
use std::future::{poll_fn, Future};
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::task::Poll;

use crate::cgroup::{self, CgroupPaths};
use crate::config::SessionConfig;
use crate::dockerfile;
use crate::env::{process_env, INPUT_CONTENT_PATH};
use crate::error::WorkerError;
use crate::source::{self, SourceError};

/// Line printed when a build finishes without pushing
pub const NO_PUSH_MESSAGE: &str = "Build complete, no image push requested";

/// Successful outcome of [`Orchestrator::execute`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Pushed,
    NoPushRequested,
}

/// Runs the phases of one session against a loaded configuration.
pub struct Orchestrator<R> {
    session: SessionConfig<R>,
    input_dir: PathBuf,
    cgroups: CgroupPaths,
    process_env: Vec<String>,
}

impl<R: StatusReporter> Orchestrator<R> {
    pub fn new(session: SessionConfig<R>) -> Self {
        Self {
            session,
            input_dir: PathBuf::from(INPUT_CONTENT_PATH),
            cgroups: CgroupPaths::default(),
            process_env: process_env(),
        }
    }

    pub fn with_input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.input_dir = dir.into();
        self
    }

    pub fn with_cgroup_paths(mut self, paths: CgroupPaths) -> Self {
        self.cgroups = paths;
        self
    }

    /// Environment git inherits, before git-specific entries are merged in
    pub fn with_process_env(mut self, env: Vec<String>) -> Self {
        self.process_env = env;
        self
    }

    pub fn build(&self) -> &Build {
        &self.session.build
    }

    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    pub fn session(&self) -> &SessionConfig<R> {
        &self.session
    }

    /// Release the session's engine client.
    pub fn close(&mut self) {
        self.session.close();
    }

    /// Fetch the build inputs: git source, binary payload from `input`,
    /// then the context directory check.
    ///
    /// `make_git` builds the git client from the prepared environment. It
    /// is not called for builds without a git source.
    pub async fn clone_source<G, F, I>(&mut self, make_git: F, input: &mut I) -> Result<(), WorkerError>
    where
        G: GitClient,
        F: FnOnce(&[String]) -> G,
        I: Read,
    {
        let mut timings = Timings::new();
        let result = catch_panic(self.fetch_inputs(make_git, input, &mut timings)).await;
        let (result, revision) = match result {
            Ok(revision) => (Ok(()), revision),
            Err(e) => {
                let reason = match &e {
                    WorkerError::Source(SourceError::MissingContextDir(_)) => {
                        StatusReason::InvalidContextDirectory
                    }
                    _ => StatusReason::FetchSourceFailed,
                };
                self.session.build.status.fail(reason);
                tracing::error!(error = %e, "failed to fetch build inputs");
                (Err(e), None)
            }
        };
        self.finalize(timings, revision).await;
        result
    }

    async fn fetch_inputs<G, F, I>(
        &mut self,
        make_git: F,
        input: &mut I,
        timings: &mut Timings,
    ) -> Result<Option<SourceRevision>, WorkerError>
    where
        G: GitClient,
        F: FnOnce(&[String]) -> G,
        I: Read,
    {
        let git_env = source::setup_git_environment(
            &mut self.session.build,
            self.session.source_secret_dir.as_deref(),
            &self.process_env,
        )?;

        let mut revision = None;
        if let (Some(env), Some(git_source)) = (&git_env, &self.session.build.spec.source.git) {
            let git = make_git(&env.env);
            revision = source::git_clone(
                &git,
                git_source,
                self.session.build.spec.revision.as_ref(),
                &self.input_dir,
                timings,
            )
            .await?;
        }
        // Secret material is not needed past the clone
        drop(git_env);

        source::extract_input_binary(
            input,
            self.session.build.spec.source.binary.as_ref(),
            &self.input_dir,
            timings,
        )
        .await?;
        source::check_context_dir(&self.input_dir, &self.session.build.spec.source.context_dir)?;
        Ok(revision)
    }

    /// Run `strategy` under the limits of the worker's cgroup.
    ///
    /// Limits that cannot be determined abort the session before the
    /// strategy is invoked.
    pub async fn execute<S: BuildStrategy>(&mut self, strategy: &S) -> Result<ExecuteOutcome, WorkerError> {
        let mut timings = Timings::new();
        let result = catch_panic(self.run_strategy(strategy, &mut timings)).await;
        if let Err(e) = &result {
            // The strategy's own reason, if any, wins
            self.session.build.status.fail(StatusReason::GenericBuildFailed);
            tracing::error!(error = %e, strategy = strategy.name(), "build failed");
        }
        self.finalize(timings, None).await;
        result
    }

    async fn run_strategy<S: BuildStrategy>(
        &mut self,
        strategy: &S,
        timings: &mut Timings,
    ) -> Result<ExecuteOutcome, WorkerError> {
        let discovery = cgroup::discover(&self.cgroups)?;
        tracing::debug!(
            limits = ?discovery.limits,
            container = %discovery.container.id,
            runtime = %discovery.container.runtime,
            "running build with cgroup limits"
        );

        let client = self.session.client.as_ref().ok_or(WorkerError::NoEngine)?;
        tracing::info!(strategy = strategy.name(), engine = client.program(), "starting build");
        strategy
            .build(BuildContext {
                client,
                build: &mut self.session.build,
                limits: &discovery.limits,
                input_dir: &self.input_dir,
                timings,
            })
            .await?;

        if self.session.build.output_image().is_none() {
            Ok(ExecuteOutcome::NoPushRequested)
        } else {
            Ok(ExecuteOutcome::Pushed)
        }
    }

    /// Write and update the Dockerfile inside the fetched inputs.
    pub async fn manage_dockerfile(&mut self) -> Result<(), WorkerError> {
        let (dir, build) = (&self.input_dir, &self.session.build);
        let result = catch_panic(async {
            dockerfile::manage_dockerfile(dir, build)?;
            Ok::<(), WorkerError>(())
        })
        .await;
        if let Err(e) = &result {
            self.session.build.status.fail(StatusReason::GenericBuildFailed);
            tracing::error!(error = %e, "failed to prepare Dockerfile");
        }
        self.finalize(Timings::new(), None).await;
        result
    }

    /// Copy content out of the descriptor's source images using the
    /// session's engine.
    pub async fn extract_image_content(&mut self) -> Result<(), WorkerError> {
        let mut timings = Timings::new();
        let result = match &self.session.client {
            Some(client) => {
                let extraction = extract_images(client, &self.session.build, &self.input_dir, &mut timings);
                catch_panic(extraction).await
            }
            None => Err(WorkerError::NoEngine),
        };
        self.finish_extraction(timings, result).await
    }

    /// [`Self::extract_image_content`] with an explicit extractor.
    pub async fn extract_image_content_with<E: ContentExtractor>(
        &mut self,
        extractor: &E,
    ) -> Result<(), WorkerError> {
        let mut timings = Timings::new();
        let extraction = extract_images(extractor, &self.session.build, &self.input_dir, &mut timings);
        let result = catch_panic(extraction).await;
        self.finish_extraction(timings, result).await
    }

    async fn finish_extraction(
        &mut self,
        timings: Timings,
        result: Result<(), WorkerError>,
    ) -> Result<(), WorkerError> {
        if let Err(e) = &result {
            self.session.build.status.fail(StatusReason::FetchImageContentFailed);
            tracing::error!(error = %e, "failed to extract image content");
        }
        self.finalize(timings, None).await;
        result
    }

    /// Flush timings and send the session's status report.
    ///
    /// A report failure is logged and does not change the outcome.
    async fn finalize(&mut self, timings: Timings, revision: Option<SourceRevision>) {
        let build = &mut self.session.build;
        build.status.stages = append_stage_and_step_info(&build.status.stages, timings.stages());
        if let Some(revision) = revision {
            build.spec.revision = Some(revision);
            build.metadata.resource_version = None;
        }
        if let Err(e) = self.session.reporter.update_details(build).await {
            tracing::error!(build = build.name(), error = %e, "failed to update build status");
        }
    }
}

/// Drive `fut`, turning a panic inside it into [`WorkerError::Panicked`]
/// so the session still reaches its status report.
async fn catch_panic<T, F>(fut: F) -> Result<T, WorkerError>
where
    F: Future<Output = Result<T, WorkerError>>,
{
    let mut fut = pin!(fut);
    poll_fn(|cx| match panic::catch_unwind(AssertUnwindSafe(|| fut.as_mut().poll(cx))) {
        Ok(poll) => poll,
        Err(payload) => Poll::Ready(Err(WorkerError::Panicked(panic_message(&*payload)))),
    })
    .await
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

async fn extract_images<E: ContentExtractor>(
    extractor: &E,
    build: &Build,
    input_dir: &Path,
    timings: &mut Timings,
) -> Result<(), WorkerError> {
    let images = &build.spec.source.images;
    if images.is_empty() {
        return Ok(());
    }
    let start = Utc::now();
    let mut result: Result<(), WorkerError> = Ok(());
    'images: for image in images {
        for path in &image.paths {
            let destination = input_dir.join(&path.destination_dir);
            tracing::info!(
                image = %image.from.name,
                source = %path.source_path,
                destination = %destination.display(),
                "extracting image content"
            );
            if let Err(e) = extractor
                .extract(&image.from.name, &path.source_path, &destination)
                .await
            {
                result = Err(e.into());
                break 'images;
            }
        }
    }
    timings.record_step(StageName::FetchInputs, StepName::FetchImageContent, start, Utc::now());
    result
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
