// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-cluster HTTP client for the build `details` endpoint

use super::{ReportError, StatusReporter};
use async_trait::async_trait;
use bw_core::redact::presence;
use bw_core::Build;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::env;

/// Mount point of the pod's service account credentials
pub const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Location and credentials of the cluster API as seen from inside a pod.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InClusterConfig {
    pub host: String,
    pub port: String,
    pub token_path: PathBuf,
    pub ca_path: PathBuf,
}

impl InClusterConfig {
    /// Read `KUBERNETES_SERVICE_HOST`/`KUBERNETES_SERVICE_PORT` and use the
    /// standard service account mount.
    pub fn from_env() -> Result<Self, ReportError> {
        let host = env::kubernetes_service_host()
            .ok_or(ReportError::NotInCluster("KUBERNETES_SERVICE_HOST"))?;
        let port = env::kubernetes_service_port()
            .ok_or(ReportError::NotInCluster("KUBERNETES_SERVICE_PORT"))?;
        let dir = Path::new(SERVICE_ACCOUNT_DIR);
        Ok(Self {
            host,
            port,
            token_path: dir.join("token"),
            ca_path: dir.join("ca.crt"),
        })
    }

    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("https://[{}]:{}", self.host, self.port)
        } else {
            format!("https://{}:{}", self.host, self.port)
        }
    }
}

fn read_credential(path: &Path) -> Result<Vec<u8>, ReportError> {
    std::fs::read(path).map_err(|e| ReportError::Credentials {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Status reporter for the builds API of one namespace.
#[derive(Clone)]
pub struct ClusterStatusClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    namespace: String,
}

impl fmt::Debug for ClusterStatusClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterStatusClient")
            .field("base_url", &self.base_url)
            .field("token", &presence(&self.token))
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl ClusterStatusClient {
    /// Client for the cluster the worker runs in
    pub fn in_cluster(namespace: &str) -> Result<Self, ReportError> {
        Self::connect(&InClusterConfig::from_env()?, namespace)
    }

    pub fn connect(config: &InClusterConfig, namespace: &str) -> Result<Self, ReportError> {
        let token = String::from_utf8_lossy(&read_credential(&config.token_path)?)
            .trim()
            .to_string();
        let ca = read_credential(&config.ca_path)?;
        let certificate =
            reqwest::Certificate::from_pem(&ca).map_err(|e| ReportError::Credentials {
                path: config.ca_path.clone(),
                reason: e.to_string(),
            })?;
        let http = reqwest::Client::builder()
            .add_root_certificate(certificate)
            .build()?;
        Ok(Self::with_http(http, config.base_url(), token, namespace))
    }

    pub(crate) fn with_http(
        http: reqwest::Client,
        base_url: String,
        token: String,
        namespace: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            namespace: namespace.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// URL of the `details` subresource for build `name`
    pub fn details_url(&self, name: &str) -> String {
        format!(
            "{}/apis/build.openshift.io/v1/namespaces/{}/builds/{}/details",
            self.base_url, self.namespace, name
        )
    }
}

#[async_trait]
impl StatusReporter for ClusterStatusClient {
    async fn update_details(&self, build: &Build) -> Result<(), ReportError> {
        let url = self.details_url(build.name());
        tracing::debug!(url = %url, phase = %build.status.phase, "updating build details");
        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.token)
            .json(build)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(ReportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
