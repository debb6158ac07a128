//! Test helpers for behavioral specifications.
//!
//! Runs the buildworker binary with a scrubbed environment so no cluster,
//! daemon or descriptor from the host leaks into a spec.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Variables the worker reads; removed before every run.
const WORKER_VARS: &[&str] = &[
    "BUILD",
    "SOURCE_SECRET_PATH",
    "DOCKER_HOST",
    "BUILD_STORAGE_DRIVER",
    "BUILD_STORAGE_CONF_PATH",
    "BUILD_REGISTRIES_CONF_PATH",
    "BUILD_REGISTRIES_DIR_PATH",
    "BUILD_SIGNATURE_POLICY_PATH",
    "BUILD_ISOLATION",
    "BUILD_LOGLEVEL",
    "BUILD_ON_PANIC",
    "KUBERNETES_SERVICE_HOST",
    "KUBERNETES_SERVICE_PORT",
    "RUST_LOG",
];

/// Returns the path to the buildworker binary, checking the llvm-cov
/// target directory first.
pub fn worker_binary() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let llvm_cov_path = manifest_dir.join("target/llvm-cov-target/debug/buildworker");
    if llvm_cov_path.exists() {
        return llvm_cov_path;
    }
    assert_cmd::cargo::cargo_bin("buildworker")
}

/// Create a CLI builder for buildworker runs
pub fn cli() -> CliBuilder {
    CliBuilder::new(worker_binary())
}

/// High-level CLI builder for fluent test assertions
pub struct CliBuilder {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
}

impl CliBuilder {
    fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    /// Run `program` instead, e.g. a symlink to the worker
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Build the command without running it
    pub fn command(self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for var in WORKER_VARS {
            cmd.env_remove(var);
        }
        for (key, value) in self.envs {
            cmd.env(key, value);
        }
        cmd
    }

    /// Run and expect success (exit code 0)
    pub fn passes(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert!(
            output.status.success(),
            "expected command to pass, got exit code {:?}\nstdout: {}\nstderr: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    /// Run and expect exit code 1
    pub fn fails(self) -> RunAssert {
        let output = self.command().output().expect("command should run");
        assert_eq!(
            output.status.code(),
            Some(1),
            "expected exit code 1\nstdout: {}\nstderr: {}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }
}

/// Result of a CLI run for chaining assertions
pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Assert stdout contains substring.
    pub fn stdout_has(self, expected: &str) -> Self {
        let stdout = self.stdout();
        assert!(
            stdout.contains(expected),
            "stdout does not contain '{}'\nstdout: {}",
            expected,
            stdout
        );
        self
    }

    /// Assert stdout is empty.
    pub fn stdout_empty(self) -> Self {
        let stdout = self.stdout();
        assert!(stdout.is_empty(), "stdout should be empty\nstdout: {}", stdout);
        self
    }

    /// Assert stderr contains substring.
    pub fn stderr_has(self, expected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            stderr.contains(expected),
            "stderr does not contain '{}'\nstderr: {}",
            expected,
            stderr
        );
        self
    }

    /// Assert stderr does not contain substring.
    pub fn stderr_lacks(self, unexpected: &str) -> Self {
        let stderr = self.stderr();
        assert!(
            !stderr.contains(unexpected),
            "stderr should not contain '{}'\nstderr: {}",
            unexpected,
            stderr
        );
        self
    }
}

/// Minimal descriptor JSON for a git build of `uri`.
pub fn git_build_json(uri: &str) -> String {
    serde_json::json!({
        "kind": "Build",
        "apiVersion": "build.openshift.io/v1",
        "metadata": { "name": "app-1", "namespace": "spec-ns" },
        "spec": { "source": { "git": { "uri": uri } } },
    })
    .to_string()
}
