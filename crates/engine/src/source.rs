// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source acquisition: git environment, clone, binary payload and context
//! directory checks.

use bw_adapters::subprocess::{run_with_input, SubprocessError};
use bw_adapters::{CloneOptions, GitClient, GitError};
use bw_core::redact::safe_for_logging_url;
use bw_core::{
    join_within, merge_env, BinaryBuildSource, Build, GitBuildSource, SourceRevision, StageName, StepName,
    Timings,
};
use chrono::Utc;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

use crate::giturl::{GitUrl, GitUrlError};
use crate::scmauth::{self, ScmAuthError, ScmAuthSetup};

/// Errors acquiring build inputs
#[derive(Debug, Error)]
pub enum SourceError {
    #[error(transparent)]
    InvalidUri(#[from] GitUrlError),
    #[error("source secret {0:?} is referenced but no secret directory is mounted")]
    SecretDirMissing(String),
    #[error("cannot setup source secret: {0}")]
    Secret(#[from] ScmAuthError),
    #[error("failed to create input directory {path}: {source}")]
    InputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Git(#[from] GitError),
    #[error("invalid binary file name {0:?}")]
    InvalidAsFile(String),
    #[error("failed to write binary input {path}: {source}")]
    BinaryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to extract binary archive: {0}")]
    BinaryExtract(#[source] SubprocessError),
    #[error("provided context directory does not exist: {0}")]
    MissingContextDir(String),
}

/// Environment and credentials for the git client
#[derive(Debug)]
pub struct GitEnvironment {
    /// Full process environment handed to git
    pub env: Vec<String>,
    /// Generated secret material, removed on drop
    pub auth: Option<ScmAuthSetup>,
}

/// Prepare git's environment for the descriptor's git source.
///
/// Returns `None` when the build has no git source. A source secret may
/// rewrite the descriptor's source URI.
pub fn setup_git_environment(
    build: &mut Build,
    secret_dir: Option<&Path>,
    process_env: &[String],
) -> Result<Option<GitEnvironment>, SourceError> {
    let secret_name = build.spec.source.source_secret.as_ref().map(|s| s.name.clone());
    let Some(git) = build.spec.source.git.as_mut() else {
        return Ok(None);
    };

    let mut git_env = vec!["GIT_ASKPASS=true".to_string()];
    let mut auth = None;
    if let Some(secret_name) = secret_name {
        let url = GitUrl::parse(&git.uri)?;
        let dir = secret_dir.ok_or(SourceError::SecretDirMissing(secret_name))?;
        let setup = scmauth::setup(&url, dir)?;
        if let Some(uri) = &setup.override_uri {
            git.uri = uri.clone();
        }
        git_env.extend(setup.env.iter().cloned());
        auth = Some(setup);
    }

    for (names, value) in [
        (["HTTP_PROXY", "http_proxy"], &git.http_proxy),
        (["HTTPS_PROXY", "https_proxy"], &git.https_proxy),
        (["NO_PROXY", "no_proxy"], &git.no_proxy),
    ] {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            git_env.extend(names.iter().map(|name| format!("{name}={value}")));
        }
    }

    Ok(Some(GitEnvironment {
        env: merge_env(process_env, &git_env),
        auth,
    }))
}

/// Clone `source` into `dir` and resolve the checked-out revision.
///
/// A commit on `revision` takes precedence over the source ref. Without
/// either, a shallow recursive clone is made. Failure to read the
/// revision afterwards is logged, not returned.
pub async fn git_clone<G: GitClient>(
    git: &G,
    source: &GitBuildSource,
    revision: Option<&SourceRevision>,
    dir: &Path,
    timings: &mut Timings,
) -> Result<Option<SourceRevision>, SourceError> {
    std::fs::create_dir_all(dir).map_err(|source| SourceError::InputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let commit = revision
        .and_then(|rev| rev.git.as_ref())
        .map(|rev| rev.commit.as_str())
        .filter(|c| !c.is_empty());
    let git_ref = commit.unwrap_or(&source.git_ref);
    let opts = if git_ref.is_empty() {
        CloneOptions {
            shallow: true,
            recursive: true,
        }
    } else {
        CloneOptions::default()
    };

    let display_uri = safe_for_logging_url(&source.uri).unwrap_or_default();
    tracing::info!(uri = %display_uri, git_ref = %git_ref, "cloning source");

    let start = Utc::now();
    git.clone_repo(&source.uri, dir, opts).await?;
    timings.record_step(StageName::FetchInputs, StepName::FetchGitSource, start, Utc::now());

    if !git_ref.is_empty() {
        git.checkout(dir, git_ref).await?;
        git.submodule_update(dir).await?;
    }

    match git.source_info(dir).await {
        Ok(info) => {
            tracing::info!(
                commit = %info.commit,
                author = %format!("{} <{}>", info.author.name, info.author.email),
                message = %info.message.lines().next().unwrap_or(""),
                "checked out source"
            );
            Ok(Some(SourceRevision::git(info)))
        }
        Err(e) => {
            tracing::error!(error = %e, "unable to retrieve git info");
            Ok(None)
        }
    }
}

/// Stream a binary payload read from `input` into `dir`.
///
/// With `as_file` the payload is stored verbatim under that name;
/// otherwise it is piped through `tar` and unpacked.
pub async fn extract_input_binary<I: Read>(
    input: &mut I,
    binary: Option<&BinaryBuildSource>,
    dir: &Path,
    timings: &mut Timings,
) -> Result<(), SourceError> {
    let Some(binary) = binary else {
        return Ok(());
    };
    std::fs::create_dir_all(dir).map_err(|source| SourceError::InputDir {
        path: dir.to_path_buf(),
        source,
    })?;

    let start = Utc::now();
    if binary.as_file.is_empty() {
        tracing::info!(dir = %dir.display(), "receiving source as archive");
        let mut tar = Command::new("tar");
        tar.arg("-x").arg("-o").arg("-m").arg("-f").arg("-").arg("-C").arg(dir);
        let bytes = run_with_input(tar, input, "tar extract")
            .await
            .map_err(SourceError::BinaryExtract)?;
        tracing::debug!(bytes, "extracted source archive");
    } else {
        let path = as_file_path(dir, &binary.as_file)?;
        tracing::info!(file = %path.display(), "receiving source as file");
        let bytes = File::create(&path)
            .and_then(|mut file| std::io::copy(input, &mut file))
            .map_err(|source| SourceError::BinaryWrite { path, source })?;
        tracing::debug!(bytes, "stored source file");
    }

    timings.record_step(StageName::FetchInputs, StepName::ExtractBinarySource, start, Utc::now());
    Ok(())
}

/// Target of an `as_file` payload; the name must stay inside `dir`.
fn as_file_path(dir: &Path, as_file: &str) -> Result<PathBuf, SourceError> {
    let name = Path::new(as_file);
    let inside = name
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !inside {
        return Err(SourceError::InvalidAsFile(as_file.to_string()));
    }
    Ok(dir.join(name))
}

/// Verify the descriptor's context directory exists below `dir`.
///
/// An absolute context directory is taken relative to `dir`; one that
/// climbs out of `dir` never exists.
pub fn check_context_dir(dir: &Path, context_dir: &str) -> Result<(), SourceError> {
    if context_dir.is_empty() {
        return Ok(());
    }
    match join_within(dir, [context_dir]) {
        Some(path) if path.exists() => Ok(()),
        _ => Err(SourceError::MissingContextDir(context_dir.to_string())),
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
