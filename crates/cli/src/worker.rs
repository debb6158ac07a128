// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One worker session: CA setup, configuration, then the requested phase.

use anyhow::Result;
use bw_adapters::{DockerStrategy, GitCli, SourceStrategy, StatusReporter, TracedGit};
use bw_engine::{
    default_ca_certs, install_ca_certs, ExecuteOutcome, Invocation, Orchestrator, SessionConfig,
    Verbosity, WorkerEnv, NO_PUSH_MESSAGE,
};

pub async fn run(invocation: Invocation, env: &WorkerEnv, verbosity: Verbosity) -> Result<()> {
    install_ca_certs(&default_ca_certs())?;

    let session = SessionConfig::load(env, invocation.needs_engine(), verbosity)?;
    tracing::info!(
        kind = %invocation,
        build = session.build.name(),
        namespace = session.build.namespace(),
        "starting build worker"
    );

    let mut orchestrator = Orchestrator::new(session);
    let result = dispatch(&mut orchestrator, invocation).await;
    orchestrator.close();
    result
}

async fn dispatch<R: StatusReporter>(
    orchestrator: &mut Orchestrator<R>,
    invocation: Invocation,
) -> Result<()> {
    match invocation {
        Invocation::GitClone => {
            let mut stdin = std::io::stdin().lock();
            orchestrator
                .clone_source(|env| TracedGit::new(GitCli::with_env(env)), &mut stdin)
                .await?;
        }
        Invocation::DockerBuild => {
            let outcome = orchestrator.execute(&DockerStrategy).await?;
            print_outcome(outcome);
        }
        Invocation::StiBuild => {
            let outcome = orchestrator.execute(&SourceStrategy::new()).await?;
            print_outcome(outcome);
        }
        Invocation::ManageDockerfile => orchestrator.manage_dockerfile().await?,
        Invocation::ExtractImageContent => orchestrator.extract_image_content().await?,
    }
    Ok(())
}

fn print_outcome(outcome: ExecuteOutcome) {
    if outcome == ExecuteOutcome::NoPushRequested {
        println!("{NO_PUSH_MESSAGE}");
    }
}
