// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker inputs read from the process environment.
//!
//! Every variable the worker consults is read here, once, into a
//! [`WorkerEnv`]. Later stages branch on its typed fields instead of
//! re-reading the environment.

use std::collections::HashMap;
use std::path::PathBuf;

/// Directory the fetched build inputs are placed in
pub const INPUT_CONTENT_PATH: &str = "/tmp/build/inputs";

/// Daemon address used when `DOCKER_HOST` is set but empty
pub const DEFAULT_DAEMON_ENDPOINT: &str = "unix:///var/run/docker.sock";

/// Log verbosity on the 0-10 scale build logs use.
///
/// Levels 4 and up enable debug diagnostics, 5 and up trace output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    pub fn new(level: u8) -> Self {
        Self(level)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Whether diagnostics gated at `level` should be produced.
    pub fn is(self, level: u8) -> bool {
        self.0 >= level
    }

    /// Log filter directive matching this verbosity
    pub fn filter_directive(self) -> &'static str {
        match self.0 {
            0..=3 => "info",
            4 => "debug",
            _ => "trace",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse().ok().map(Self)
    }
}

/// Embedded store overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedOptions {
    pub storage_driver: Option<String>,
    pub storage_conf: Option<PathBuf>,
    pub registries_conf: Option<PathBuf>,
    pub registries_dir: Option<PathBuf>,
    pub signature_policy: Option<PathBuf>,
    pub isolation: Option<String>,
}

/// How the session reaches a container engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineMode {
    /// An external daemon at `endpoint`
    Daemon { endpoint: String },
    /// The embedded storage-backed engine
    Embedded(EmbeddedOptions),
}

/// Validated snapshot of the worker's environment inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    /// Serialized build descriptor (empty when unset)
    pub build: String,
    pub source_secret_path: Option<PathBuf>,
    pub engine: EngineMode,
    pub log_level: Option<Verbosity>,
    /// Abort the process right after logging a panic
    pub crash_on_panic: bool,
}

impl WorkerEnv {
    pub fn from_env() -> Self {
        Self::from_vars(vars_lossy())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars.into_iter().collect();
        let non_empty = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();
        let non_empty_path = |name: &str| non_empty(name).map(PathBuf::from);

        let engine = match vars.get("DOCKER_HOST") {
            Some(host) if host.is_empty() => EngineMode::Daemon {
                endpoint: DEFAULT_DAEMON_ENDPOINT.to_string(),
            },
            Some(host) => EngineMode::Daemon {
                endpoint: host.clone(),
            },
            None => EngineMode::Embedded(EmbeddedOptions {
                storage_driver: non_empty("BUILD_STORAGE_DRIVER"),
                storage_conf: non_empty_path("BUILD_STORAGE_CONF_PATH"),
                registries_conf: non_empty_path("BUILD_REGISTRIES_CONF_PATH"),
                registries_dir: non_empty_path("BUILD_REGISTRIES_DIR_PATH"),
                signature_policy: non_empty_path("BUILD_SIGNATURE_POLICY_PATH"),
                isolation: non_empty("BUILD_ISOLATION"),
            }),
        };

        Self {
            build: vars.get("BUILD").cloned().unwrap_or_default(),
            source_secret_path: non_empty_path("SOURCE_SECRET_PATH"),
            engine,
            log_level: non_empty("BUILD_LOGLEVEL").and_then(|v| Verbosity::parse(&v)),
            crash_on_panic: vars.get("BUILD_ON_PANIC").is_some_and(|v| v == "crash"),
        }
    }
}

/// The process environment as `NAME=value` entries
pub fn process_env() -> Vec<String> {
    vars_lossy().map(|(k, v)| format!("{k}={v}")).collect()
}

fn vars_lossy() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os().map(|(k, v)| {
        (
            k.to_string_lossy().into_owned(),
            v.to_string_lossy().into_owned(),
        )
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
