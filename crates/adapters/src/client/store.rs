// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Embedded image store used when no external daemon is configured.

use fs2::FileExt;
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

use super::EngineError;

/// Lock file held in the graph root while a session owns the store
pub const LOCK_FILE: &str = "buildworker.lock";

/// Embedded store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Graph driver name, e.g. `overlay` or `vfs`
    pub driver: String,
    pub graph_root: PathBuf,
    pub run_root: PathBuf,
    pub registries_conf: Option<PathBuf>,
    pub registries_dir: Option<PathBuf>,
    pub signature_policy: Option<PathBuf>,
    /// Build isolation mode passed to the engine
    pub isolation: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            driver: "overlay".to_string(),
            graph_root: PathBuf::from("/var/lib/containers/storage"),
            run_root: PathBuf::from("/run/containers/storage"),
            registries_conf: None,
            registries_dir: None,
            signature_policy: None,
            isolation: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StorageFile {
    #[serde(default)]
    storage: StorageSection,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    driver: Option<String>,
    graphroot: Option<PathBuf>,
    runroot: Option<PathBuf>,
}

impl StoreOptions {
    /// Overlay settings from a `storage.conf` document. Keys the document
    /// does not set keep their current values.
    pub fn apply_toml(&mut self, text: &str) -> Result<(), toml::de::Error> {
        let file: StorageFile = toml::from_str(text)?;
        let section = file.storage;
        if let Some(driver) = section.driver.filter(|d| !d.is_empty()) {
            self.driver = driver;
        }
        if let Some(root) = section.graphroot {
            self.graph_root = root;
        }
        if let Some(root) = section.runroot {
            self.run_root = root;
        }
        Ok(())
    }

    /// Overlay settings from a `storage.conf` file on disk.
    pub fn reload_from_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let storage_config = |reason: String| EngineError::StorageConfig {
            path: path.to_path_buf(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| storage_config(e.to_string()))?;
        self.apply_toml(&text)
            .map_err(|e| storage_config(e.to_string()))
    }
}

/// Exclusively owned embedded store.
///
/// Holds an advisory lock in the graph root from [`EmbeddedStore::open`]
/// until [`EmbeddedStore::shutdown`] or drop.
#[derive(Debug)]
pub struct EmbeddedStore {
    options: StoreOptions,
    lock: Option<File>,
}

impl EmbeddedStore {
    pub fn open(options: StoreOptions) -> Result<Self, EngineError> {
        std::fs::create_dir_all(&options.graph_root)?;
        std::fs::create_dir_all(&options.run_root)?;

        let lock_path = options.graph_root.join(LOCK_FILE);
        let lock = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        lock.try_lock_exclusive()
            .map_err(|source| EngineError::Locked {
                path: lock_path.clone(),
                source,
            })?;

        tracing::debug!(
            driver = %options.driver,
            graph_root = %options.graph_root.display(),
            run_root = %options.run_root.display(),
            "opened embedded store"
        );
        Ok(Self {
            options,
            lock: Some(lock),
        })
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn is_open(&self) -> bool {
        self.lock.is_some()
    }

    /// Release the store. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<(), EngineError> {
        if let Some(lock) = self.lock.take() {
            lock.unlock()?;
            tracing::debug!(graph_root = %self.options.graph_root.display(), "embedded store shut down");
        }
        Ok(())
    }

    pub(super) fn global_args(&self) -> Vec<String> {
        let o = &self.options;
        let mut args = vec![
            "--root".to_string(),
            o.graph_root.display().to_string(),
            "--runroot".to_string(),
            o.run_root.display().to_string(),
            "--storage-driver".to_string(),
            o.driver.clone(),
        ];
        if let Some(path) = &o.registries_conf {
            args.extend(["--registries-conf".to_string(), path.display().to_string()]);
        }
        if let Some(path) = &o.registries_dir {
            args.extend(["--registries-conf-dir".to_string(), path.display().to_string()]);
        }
        args
    }

    pub(super) fn build_only_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(isolation) = &self.options.isolation {
            args.extend(["--isolation".to_string(), isolation.clone()]);
        }
        if let Some(path) = &self.options.signature_policy {
            args.extend(["--signature-policy".to_string(), path.display().to_string()]);
        }
        args
    }
}

impl Drop for EmbeddedStore {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "error shutting down storage");
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
