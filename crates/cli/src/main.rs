// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! buildworker - container image build worker

mod logging;
mod worker;

use bw_engine::{Invocation, Verbosity, WorkerEnv};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::path::Path;

#[derive(Parser)]
#[command(
    name = "buildworker",
    version,
    about = "Container image build worker"
)]
struct Cli {
    /// Log verbosity from 0 to 10 (default: BUILD_LOGLEVEL)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(0..=10))]
    loglevel: Option<u8>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Fetch the build inputs into the input directory
    GitClone,
    /// Build and push an image from a Dockerfile
    DockerBuild,
    /// Build and push an image from source with s2i
    StiBuild,
    /// Write the inline Dockerfile and apply build parameters to it
    ManageDockerfile,
    /// Copy content out of the build's source images
    ExtractImageContent,
}

impl From<Command> for Invocation {
    fn from(command: Command) -> Self {
        match command {
            Command::GitClone => Invocation::GitClone,
            Command::DockerBuild => Invocation::DockerBuild,
            Command::StiBuild => Invocation::StiBuild,
            Command::ManageDockerfile => Invocation::ManageDockerfile,
            Command::ExtractImageContent => Invocation::ExtractImageContent,
        }
    }
}

/// The subcommand, else the kind named by the executable.
fn resolve_invocation(command: Option<Command>, argv0: Option<&OsStr>) -> Option<Invocation> {
    if let Some(command) = command {
        return Some(command.into());
    }
    let basename = Path::new(argv0?).file_name()?.to_str()?;
    Invocation::from_basename(basename)
}

fn resolve_verbosity(flag: Option<u8>, env: &WorkerEnv) -> Verbosity {
    flag.map(Verbosity::new).or(env.log_level).unwrap_or_default()
}

/// Format an anyhow error, skipping causes already in the top message.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();
    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let argv0 = std::env::args_os().next();
    let Some(invocation) = resolve_invocation(cli.command, argv0.as_deref()) else {
        eprintln!("Error: no build kind given; run with a subcommand or as buildworker-<kind>");
        std::process::exit(1);
    };

    let env = WorkerEnv::from_env();
    let verbosity = resolve_verbosity(cli.loglevel, &env);
    logging::init(verbosity);
    logging::install_panic_hook(env.crash_on_panic);

    if let Err(e) = worker::run(invocation, &env, verbosity).await {
        eprintln!("Error: {}", format_error(&e));
        std::process::exit(1);
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
