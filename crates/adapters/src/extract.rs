// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Copying content out of existing images

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tokio::process::Command;

use crate::client::{EngineClient, EngineError};
use crate::subprocess::run_checked;

/// Errors from image content extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to prepare {path}: {source}")]
    Destination {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    Failed(String),
}

/// Adapter that copies a path out of an image onto the local filesystem.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Copy `source_path` from `image` into the `destination` directory.
    async fn extract(
        &self,
        image: &str,
        source_path: &str,
        destination: &Path,
    ) -> Result<(), ExtractError>;
}

fn prepare_destination(destination: &Path) -> Result<(), ExtractError> {
    std::fs::create_dir_all(destination).map_err(|source| ExtractError::Destination {
        path: destination.display().to_string(),
        source,
    })
}

impl EngineClient {
    async fn extract_via_daemon(
        &self,
        image: &str,
        source_path: &str,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let container = self
            .run(&["create", image, "/bin/true"], "container create")
            .await?;
        let from = format!("{container}:{source_path}");
        let dest = destination.display().to_string();
        let copied = self.run(&["cp", &from, &dest], "container cp").await;
        if let Err(e) = self.run(&["rm", &container], "container rm").await {
            tracing::warn!(container = %container, error = %e, "failed to remove extraction container");
        }
        copied?;
        Ok(())
    }

    async fn extract_via_store(
        &self,
        image: &str,
        source_path: &str,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let container = self.run(&["from", image], "buildah from").await?;
        let copied = match self.run(&["mount", &container], "buildah mount").await {
            Ok(mount) => {
                let mut cp = Command::new("cp");
                cp.arg("-a")
                    .arg(Path::new(&mount).join(source_path.trim_start_matches('/')))
                    .arg(destination);
                let copied = run_checked(cp, "copy image content")
                    .await
                    .map(drop)
                    .map_err(|e| ExtractError::Engine(e.into()));
                if let Err(e) = self.run(&["umount", &container], "buildah umount").await {
                    tracing::warn!(container = %container, error = %e, "failed to unmount extraction container");
                }
                copied
            }
            Err(e) => Err(e.into()),
        };
        if let Err(e) = self.run(&["rm", &container], "buildah rm").await {
            tracing::warn!(container = %container, error = %e, "failed to remove extraction container");
        }
        copied
    }
}

#[async_trait]
impl ContentExtractor for EngineClient {
    async fn extract(
        &self,
        image: &str,
        source_path: &str,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        prepare_destination(destination)?;
        tracing::info!(image, source_path, destination = %destination.display(), "extracting image content");
        match self {
            EngineClient::Daemon(_) => {
                self.extract_via_daemon(image, source_path, destination)
                    .await
            }
            EngineClient::Embedded(_) => {
                self.extract_via_store(image, source_path, destination)
                    .await
            }
        }
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExtractCall, FakeExtractor};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ContentExtractor, ExtractError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    /// Recorded extraction
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ExtractCall {
        pub image: String,
        pub source_path: String,
        pub destination: PathBuf,
    }

    #[derive(Default)]
    struct FakeExtractorState {
        calls: Vec<ExtractCall>,
        failing_image: Option<String>,
    }

    /// Fake extractor. A successful call creates the destination directory
    /// with an empty file named after the source path's last component.
    #[derive(Clone, Default)]
    pub struct FakeExtractor {
        inner: Arc<Mutex<FakeExtractorState>>,
    }

    impl FakeExtractor {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail extractions from `image`
        pub fn failing_for(self, image: &str) -> Self {
            self.inner.lock().failing_image = Some(image.to_string());
            self
        }

        pub fn calls(&self) -> Vec<ExtractCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl ContentExtractor for FakeExtractor {
        async fn extract(
            &self,
            image: &str,
            source_path: &str,
            destination: &Path,
        ) -> Result<(), ExtractError> {
            let mut inner = self.inner.lock();
            inner.calls.push(ExtractCall {
                image: image.to_string(),
                source_path: source_path.to_string(),
                destination: destination.to_path_buf(),
            });
            if inner.failing_image.as_deref() == Some(image) {
                return Err(ExtractError::Failed(format!("cannot read {image}")));
            }
            super::prepare_destination(destination)?;
            if let Some(name) = Path::new(source_path).file_name() {
                std::fs::write(destination.join(name), b"")
                    .map_err(|e| ExtractError::Failed(e.to_string()))?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "extract_tests.rs"]
mod tests;
