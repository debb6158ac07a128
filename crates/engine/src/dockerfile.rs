// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dockerfile preparation for docker strategy builds.

use bw_core::{join_within, Build, DockerStrategyOptions, EnvVar};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Prefix of the labels describing the build that produced an image
const LABEL_NAMESPACE: &str = "io.openshift.";

const DEFAULT_DOCKERFILE: &str = "Dockerfile";

#[derive(Debug, Error)]
pub enum DockerfileError {
    #[error("Dockerfile {} is outside the build inputs", .0.display())]
    OutsideInputs(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Location of the build's Dockerfile below `dir`
pub fn dockerfile_path(dir: &Path, build: &Build) -> Result<PathBuf, DockerfileError> {
    let name = build
        .spec
        .strategy
        .docker_strategy
        .as_ref()
        .map(|s| s.dockerfile_path.as_str())
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_DOCKERFILE);
    let context = build.spec.source.context_dir.as_str();
    join_within(dir, [context, name])
        .ok_or_else(|| DockerfileError::OutsideInputs(Path::new(context).join(name)))
}

/// Write the inline Dockerfile, if any, then add the build's parameters
/// to the Dockerfile of a docker strategy build.
///
/// Returns the Dockerfile touched, or `None` when there was nothing to do.
pub fn manage_dockerfile(dir: &Path, build: &Build) -> Result<Option<PathBuf>, DockerfileError> {
    let path = dockerfile_path(dir, build)?;
    let mut touched = false;

    if let Some(inline) = &build.spec.source.dockerfile {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| DockerfileError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        write(&path, inline)?;
        tracing::info!(path = %path.display(), "wrote inline Dockerfile");
        touched = true;
    }

    if let Some(strategy) = &build.spec.strategy.docker_strategy {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no Dockerfile to update");
            return Ok(touched.then_some(path));
        }
        let original = std::fs::read_to_string(&path).map_err(|source| DockerfileError::Read {
            path: path.clone(),
            source,
        })?;
        write(&path, &add_build_parameters(&original, build, strategy))?;
        tracing::debug!(path = %path.display(), "added build parameters to Dockerfile");
        touched = true;
    }

    Ok(touched.then_some(path))
}

/// Rewrite the final stage's base image and append build environment and
/// labels.
pub fn add_build_parameters(dockerfile: &str, build: &Build, strategy: &DockerStrategyOptions) -> String {
    let mut lines: Vec<String> = dockerfile.lines().map(str::to_string).collect();
    let last_from = last_from(&lines);

    if let (Some(index), Some(from)) = (last_from, strategy.from.as_ref()) {
        lines[index] = replace_from(&lines[index], &from.name);
    }
    if !strategy.env.is_empty() {
        let env = format!("ENV {}", key_values(&strategy.env));
        match last_from {
            Some(index) => lines.insert(index + 1, env),
            None => lines.push(env),
        }
    }
    lines.push(format!("LABEL {}", key_values(&build_labels(build))));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Labels describing the build
pub fn build_labels(build: &Build) -> Vec<EnvVar> {
    let mut labels = vec![
        EnvVar::new(format!("{LABEL_NAMESPACE}build.name"), build.name()),
        EnvVar::new(format!("{LABEL_NAMESPACE}build.namespace"), build.namespace()),
    ];
    if let Some(commit) = build.source_commit() {
        labels.push(EnvVar::new(format!("{LABEL_NAMESPACE}build.commit.id"), commit));
    }
    labels
}

/// Index of the last `FROM` instruction. Lines continuing an instruction
/// ended by `\` are not instructions; comments and blank lines inside a
/// continuation do not end it.
fn last_from(lines: &[String]) -> Option<usize> {
    let mut continued = false;
    let mut last = None;
    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if continued && (trimmed.is_empty() || trimmed.starts_with('#')) {
            continue;
        }
        if !continued && is_from(line) {
            last = Some(index);
        }
        continued = trimmed.ends_with('\\');
    }
    last
}

fn is_from(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .is_some_and(|word| word.eq_ignore_ascii_case("FROM"))
}

/// `FROM` line with `image` as base, keeping flags and the stage alias.
fn replace_from(line: &str, image: &str) -> String {
    let words: Vec<&str> = line.split_whitespace().skip(1).collect();
    let mut parts = vec!["FROM".to_string()];
    parts.extend(
        words
            .iter()
            .take_while(|w| w.starts_with("--"))
            .map(|w| w.to_string()),
    );
    parts.push(image.to_string());
    if let Some(pos) = words.iter().position(|w| w.eq_ignore_ascii_case("AS")) {
        if let Some(alias) = words.get(pos + 1) {
            parts.push(format!("AS {alias}"));
        }
    }
    parts.join(" ")
}

fn key_values(vars: &[EnvVar]) -> String {
    vars.iter()
        .map(|v| format!("{}={}", quote(&v.name), quote(&v.value)))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn write(path: &Path, contents: &str) -> Result<(), DockerfileError> {
    std::fs::write(path, contents).map_err(|source| DockerfileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "dockerfile_tests.rs"]
mod tests;
