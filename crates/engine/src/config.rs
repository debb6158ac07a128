// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session configuration: descriptor, engine client and status reporter.

use bw_adapters::{
    ClusterStatusClient, DaemonEndpoint, EmbeddedStore, EngineClient, EngineError, ReportError,
    StatusReporter, StoreOptions, TracedReporter,
};
use bw_core::redact::safe_for_logging_build;
use bw_core::{Build, DescriptorError};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::env::{EmbeddedOptions, EngineMode, Verbosity, WorkerEnv};

/// Errors building a session configuration. None of these can be reported
/// to the control plane.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("no Docker configuration defined: {0}")]
    Daemon(#[source] EngineError),
    #[error("no daemonless store: {0}")]
    Store(#[source] EngineError),
    #[error("cannot connect to the server: {0}")]
    Cluster(#[source] ReportError),
}

/// Everything one build session needs, built once at start-up.
pub struct SessionConfig<R> {
    pub build: Build,
    /// Mounted source secret, if any
    pub source_secret_dir: Option<PathBuf>,
    /// Present only for invocations that drive an engine
    pub client: Option<EngineClient>,
    pub reporter: R,
    pub verbosity: Verbosity,
}

/// Reporter used outside tests
pub type ClusterReporter = TracedReporter<ClusterStatusClient>;

impl SessionConfig<ClusterReporter> {
    /// Load a session reporting to the cluster the worker runs in.
    pub fn load(env: &WorkerEnv, needs_engine: bool, verbosity: Verbosity) -> Result<Self, ConfigError> {
        Self::load_with(env, needs_engine, verbosity, |namespace| {
            ClusterStatusClient::in_cluster(namespace).map(TracedReporter::new)
        })
    }
}

impl<R: StatusReporter> SessionConfig<R> {
    /// Load a session, building the reporter with `connect` for the
    /// descriptor's namespace.
    pub fn load_with<F>(
        env: &WorkerEnv,
        needs_engine: bool,
        verbosity: Verbosity,
        connect: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Result<R, ReportError>,
    {
        let build = Build::from_json(&env.build)?;
        if verbosity.is(4) {
            match safe_for_logging_build(&build).to_json() {
                Ok(json) => tracing::debug!(build = %json, "redacted build"),
                Err(e) => tracing::debug!(error = %e, "unable to print debug line"),
            }
        }

        let client = if needs_engine {
            Some(open_engine(&env.engine)?)
        } else {
            None
        };
        if let Some(client) = &client {
            tracing::info!(
                engine = client.program(),
                endpoint = client.endpoint_label(),
                "engine client ready"
            );
        }

        let reporter = connect(build.namespace()).map_err(ConfigError::Cluster)?;

        Ok(Self {
            build,
            source_secret_dir: env.source_secret_path.clone(),
            client,
            reporter,
            verbosity,
        })
    }

    /// Release the engine client. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(EngineClient::Embedded(store)) = self.client.as_mut() {
            if let Err(e) = store.shutdown() {
                tracing::error!(error = %e, "error shutting down storage");
            }
        }
    }
}

fn open_engine(mode: &EngineMode) -> Result<EngineClient, ConfigError> {
    match mode {
        EngineMode::Daemon { endpoint } => DaemonEndpoint::parse(endpoint)
            .map(EngineClient::Daemon)
            .map_err(ConfigError::Daemon),
        EngineMode::Embedded(options) => EmbeddedStore::open(store_options(options)?)
            .map(EngineClient::Embedded)
            .map_err(ConfigError::Store),
    }
}

/// Store options after applying overrides.
///
/// The driver override is applied first so a storage configuration file
/// can still replace it. Path overrides apply only to paths that exist.
pub fn store_options(options: &EmbeddedOptions) -> Result<StoreOptions, ConfigError> {
    let mut store = StoreOptions::default();
    if let Some(driver) = &options.storage_driver {
        store.driver = driver.clone();
    }
    if let Some(conf) = existing(&options.storage_conf) {
        store.reload_from_file(conf).map_err(ConfigError::Store)?;
    }
    store.registries_conf = existing(&options.registries_conf).map(Path::to_path_buf);
    store.registries_dir = existing(&options.registries_dir).map(Path::to_path_buf);
    store.signature_policy = existing(&options.signature_policy).map(Path::to_path_buf);
    store.isolation = options.isolation.clone();
    Ok(store)
}

fn existing(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| p.exists())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
