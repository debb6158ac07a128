// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installation of the cluster's CA certificates into the system trust
//! directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

const SERVICE_ACCOUNT_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";
const TRUST_DIR: &str = "/etc/pki/tls/certs";

#[derive(Debug, Error)]
#[error("Error setting up {label} CA cert: {source}")]
pub struct CertError {
    pub label: &'static str,
    #[source]
    pub source: std::io::Error,
}

/// One certificate copied into the trust directory when present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaCert {
    pub label: &'static str,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Cluster and service CA locations
pub fn default_ca_certs() -> Vec<CaCert> {
    let account = Path::new(SERVICE_ACCOUNT_DIR);
    let trust = Path::new(TRUST_DIR);
    vec![
        CaCert {
            label: "cluster",
            source: account.join("ca.crt"),
            destination: trust.join("cluster.crt"),
        },
        CaCert {
            label: "service",
            source: account.join("service-ca.crt"),
            destination: trust.join("service.crt"),
        },
    ]
}

/// Copy every present certificate, overwriting the destination without
/// preserving attributes. Returns the destinations written.
pub fn install_ca_certs(certs: &[CaCert]) -> Result<Vec<PathBuf>, CertError> {
    let mut installed = Vec::new();
    for cert in certs {
        if !cert.source.exists() {
            continue;
        }
        copy_contents(&cert.source, &cert.destination).map_err(|source| CertError {
            label: cert.label,
            source,
        })?;
        tracing::debug!(label = cert.label, destination = %cert.destination.display(), "installed CA cert");
        installed.push(cert.destination.clone());
    }
    Ok(installed)
}

fn copy_contents(src: &Path, dst: &Path) -> std::io::Result<()> {
    let mut input = std::fs::File::open(src)?;
    let mut output = std::fs::File::create(dst)?;
    std::io::copy(&mut input, &mut output)?;
    output.sync_all()
}

#[cfg(test)]
#[path = "certs_tests.rs"]
mod tests;
