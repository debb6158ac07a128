// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers
//!
//! No helper here imposes a timeout: wall-clock bounds on a build belong to
//! whatever runs the worker process.

use std::io::{ErrorKind, Read};
use std::process::{ExitStatus, Output, Stdio};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{description} failed: {source}")]
    Spawn {
        description: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{description} exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        description: String,
        status: ExitStatus,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

fn spawn_error(description: &str) -> impl FnOnce(std::io::Error) -> SubprocessError + '_ {
    move |source| SubprocessError::Spawn {
        description: description.to_string(),
        source,
    }
}

fn check(output: Output, description: &str) -> Result<Output, SubprocessError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(SubprocessError::Failed {
            description: description.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Run a command to completion and capture its output.
///
/// A non-zero exit is not an error here; use [`run_checked`] for that.
pub async fn run_command(mut cmd: Command, description: &str) -> Result<Output, SubprocessError> {
    cmd.output().await.map_err(spawn_error(description))
}

/// Run a command and return its trimmed stdout, failing on non-zero exit.
pub async fn run_checked(cmd: Command, description: &str) -> Result<String, SubprocessError> {
    let output = check(run_command(cmd, description).await?, description)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Size of the chunks [`run_with_input`] copies into a child's stdin
pub const INPUT_CHUNK: usize = 64 * 1024;

/// Run a command with `input` streamed to its stdin, failing on non-zero
/// exit. Returns the number of bytes fed.
///
/// At most [`INPUT_CHUNK`] bytes of `input` are held at a time. The child's
/// stdout is discarded; stderr is kept for the error.
pub async fn run_with_input<R: Read>(
    mut cmd: Command,
    input: &mut R,
    description: &str,
) -> Result<u64, SubprocessError> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(spawn_error(description))?;

    let stdin = child.stdin.take();
    let feed = async move {
        let mut fed = 0u64;
        let Some(mut stdin) = stdin else {
            return Ok(fed);
        };
        let mut chunk = vec![0u8; INPUT_CHUNK];
        loop {
            let n = match input.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            stdin.write_all(&chunk[..n]).await?;
            fed += n as u64;
        }
        // Closing stdin signals end of input
        drop(stdin);
        Ok::<u64, std::io::Error>(fed)
    };
    let stderr = child.stderr.take();
    let drain = async move {
        let mut captured = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut captured).await;
        }
        captured
    };

    let (fed, stderr) = tokio::join!(feed, drain);
    let status = child.wait().await.map_err(spawn_error(description))?;
    if !status.success() {
        return Err(SubprocessError::Failed {
            description: description.to_string(),
            status,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        });
    }
    fed.map_err(spawn_error(description))
}

/// Run a long-lived engine command whose progress the build log should show.
///
/// Both output streams go to the worker's stderr; stdout stays reserved for
/// the worker's own result line.
pub async fn run_streaming(mut cmd: Command, description: &str) -> Result<(), SubprocessError> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(std::io::stderr()))
        .stderr(Stdio::inherit());
    let status = cmd.status().await.map_err(spawn_error(description))?;
    if status.success() {
        Ok(())
    } else {
        Err(SubprocessError::Failed {
            description: description.to_string(),
            status,
            stderr: String::new(),
        })
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
