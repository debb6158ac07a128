// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container engine client: an external daemon or the embedded store.
//!
//! Both variants drive a command-line engine (`docker` for a daemon,
//! `buildah` for the embedded store). They share flag names for building,
//! so build requests render to the same arguments apart from the
//! engine-specific global and isolation flags.

mod store;

pub use store::{EmbeddedStore, StoreOptions};

use bw_core::{EnvVar, Limit, ResourceLimits};
use std::path::PathBuf;
use thiserror::Error;
use tokio::process::Command;
use url::Url;

use crate::subprocess::{run_checked, run_streaming, SubprocessError};

/// Endpoint schemes accepted for an external daemon
const DAEMON_SCHEMES: &[&str] = &["unix", "tcp", "http", "https", "npipe"];

/// Errors from the container engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    #[error("failed to read storage configuration {path}: {reason}")]
    StorageConfig { path: PathBuf, reason: String },
    #[error("failed to lock storage at {path}: {source}")]
    Locked {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Command(#[from] SubprocessError),
}

/// Validated address of an external engine daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonEndpoint(String);

impl DaemonEndpoint {
    pub fn parse(endpoint: &str) -> Result<Self, EngineError> {
        let invalid = |reason: String| EngineError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason,
        };
        let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
        if !DAEMON_SCHEMES.contains(&url.scheme()) {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        Ok(Self(endpoint.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parameters of one image build
#[derive(Debug, Clone)]
pub struct ImageBuildRequest<'a> {
    pub tag: &'a str,
    pub dockerfile: PathBuf,
    pub context_dir: PathBuf,
    pub build_args: &'a [EnvVar],
    pub no_cache: bool,
    pub pull: bool,
    pub limits: &'a ResourceLimits,
}

/// Client for the container engine selected for this session.
#[derive(Debug)]
pub enum EngineClient {
    Daemon(DaemonEndpoint),
    Embedded(EmbeddedStore),
}

impl EngineClient {
    pub fn program(&self) -> &'static str {
        match self {
            EngineClient::Daemon(_) => "docker",
            EngineClient::Embedded(_) => "buildah",
        }
    }

    /// Human-readable endpoint for logs
    pub fn endpoint_label(&self) -> &str {
        match self {
            EngineClient::Daemon(endpoint) => endpoint.as_str(),
            EngineClient::Embedded(_) => "n/a",
        }
    }

    /// Flags placed before every engine subcommand.
    pub fn global_args(&self) -> Vec<String> {
        match self {
            EngineClient::Daemon(endpoint) => {
                vec!["--host".to_string(), endpoint.as_str().to_string()]
            }
            EngineClient::Embedded(store) => store.global_args(),
        }
    }

    /// Full argument list for an image build, subcommand included.
    pub fn build_args(&self, req: &ImageBuildRequest<'_>) -> Vec<String> {
        let mut args = self.global_args();
        args.push(
            match self {
                EngineClient::Daemon(_) => "build",
                EngineClient::Embedded(_) => "bud",
            }
            .to_string(),
        );
        args.extend(["--tag".to_string(), req.tag.to_string()]);
        args.extend(["--file".to_string(), req.dockerfile.display().to_string()]);
        args.extend(limit_args(req.limits));
        for arg in req.build_args {
            args.extend(["--build-arg".to_string(), format!("{}={}", arg.name, arg.value)]);
        }
        if req.no_cache {
            args.push("--no-cache".to_string());
        }
        if req.pull {
            args.push("--pull".to_string());
        }
        if let EngineClient::Embedded(store) = self {
            args.extend(store.build_only_args());
        }
        args.push(req.context_dir.display().to_string());
        args
    }

    /// Engine command with the global flags applied
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let mut cmd = Command::new(self.program());
        cmd.args(self.global_args()).args(args);
        cmd
    }

    /// Run an engine subcommand and return its trimmed stdout.
    pub async fn run(&self, args: &[&str], description: &str) -> Result<String, EngineError> {
        Ok(run_checked(self.command(args), description).await?)
    }

    pub async fn build_image(&self, req: &ImageBuildRequest<'_>) -> Result<(), EngineError> {
        let mut cmd = Command::new(self.program());
        cmd.args(self.build_args(req));
        tracing::info!(engine = self.program(), tag = req.tag, "building image");
        run_streaming(cmd, "image build").await?;
        Ok(())
    }

    pub async fn push_image(&self, tag: &str) -> Result<(), EngineError> {
        let cmd = self.command(["push", tag]);
        tracing::info!(engine = self.program(), tag, "pushing image");
        run_streaming(cmd, "image push").await?;
        Ok(())
    }
}

fn limit_args(limits: &ResourceLimits) -> Vec<String> {
    let mut args = Vec::new();
    let mut push = |flag: &str, limit: Limit| {
        if let Some(value) = limit.value() {
            args.push(flag.to_string());
            args.push(value.to_string());
        }
    };
    push("--memory", limits.memory_limit_bytes);
    push("--memory-swap", limits.memory_swap);
    push("--cpu-shares", limits.cpu_shares);
    push("--cpu-quota", limits.cpu_quota);
    push("--cpu-period", limits.cpu_period);
    if let Some(parent) = &limits.parent {
        args.push("--cgroup-parent".to_string());
        args.push(parent.clone());
    }
    args
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
