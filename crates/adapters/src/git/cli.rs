// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `git` command-line client

use super::{parse_source_info, CloneOptions, GitClient, GitError, SOURCE_INFO_FORMAT};
use crate::subprocess::run_checked;
use async_trait::async_trait;
use bw_core::{env_name, GitSourceRevision};
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;

/// Git client that shells out to the `git` binary.
#[derive(Clone)]
pub struct GitCli {
    pub(super) env: Arc<Vec<(String, String)>>,
}

impl GitCli {
    /// Build a client whose commands see exactly `env` (`NAME=value` entries).
    pub fn with_env(env: &[String]) -> Self {
        let pairs = env
            .iter()
            .map(|entry| {
                let name = env_name(entry);
                let value = entry.get(name.len() + 1..).unwrap_or_default();
                (name.to_string(), value.to_string())
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        Self {
            env: Arc::new(pairs),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new("git");
        cmd.env_clear().envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }

    fn command_in(&self, dir: &Path) -> Command {
        let mut cmd = self.command();
        cmd.current_dir(dir);
        cmd
    }
}

#[async_trait]
impl GitClient for GitCli {
    async fn clone_repo(&self, uri: &str, dir: &Path, opts: CloneOptions) -> Result<(), GitError> {
        let mut cmd = self.command();
        cmd.arg("clone");
        if opts.shallow {
            cmd.arg("--depth=1");
        }
        if opts.recursive {
            cmd.arg("--recursive");
        }
        cmd.arg("--").arg(uri).arg(dir);
        run_checked(cmd, "git clone").await?;
        Ok(())
    }

    async fn checkout(&self, dir: &Path, git_ref: &str) -> Result<(), GitError> {
        let mut cmd = self.command_in(dir);
        cmd.args(["checkout", git_ref]);
        run_checked(cmd, "git checkout").await?;
        Ok(())
    }

    async fn submodule_update(&self, dir: &Path) -> Result<(), GitError> {
        let mut cmd = self.command_in(dir);
        cmd.args(["submodule", "update", "--init", "--recursive"]);
        run_checked(cmd, "git submodule update").await?;
        Ok(())
    }

    async fn source_info(&self, dir: &Path) -> Result<GitSourceRevision, GitError> {
        let mut cmd = self.command_in(dir);
        cmd.args(["log", "-1", SOURCE_INFO_FORMAT]);
        let output = run_checked(cmd, "git log").await?;
        parse_source_info(&output)
    }
}
