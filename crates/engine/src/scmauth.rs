// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source secret files mapped onto git authentication.
//!
//! Each recognised file in the secret directory enables one method, subject
//! to the transport of the source URL:
//!
//! | file             | transport | effect                                      |
//! |------------------|-----------|---------------------------------------------|
//! | `ssh-privatekey` | ssh       | `GIT_SSH` wrapper using the key             |
//! | `username`       | http(s)   | source URL carries the user name            |
//! | `password`       | http(s)   | credential store + `GIT_CONFIG_GLOBAL`      |
//! | `ca.crt`         | https     | `GIT_SSL_CAINFO`                            |
//! | `.gitconfig`     | any       | included from the generated global config   |
//!
//! Generated material lives in a [`TempDir`] owned by the returned
//! [`ScmAuthSetup`] and disappears with it.

use std::fs;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

use crate::giturl::GitUrl;

const SSH_PRIVATE_KEY: &str = "ssh-privatekey";
const KNOWN_HOSTS: &str = "known_hosts";
const USERNAME: &str = "username";
const PASSWORD: &str = "password";
const CA_CERT: &str = "ca.crt";
const GIT_CONFIG: &str = ".gitconfig";

#[derive(Debug, Error)]
pub enum ScmAuthError {
    #[error("failed to read secret {path}: {source}")]
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
    #[error("failed to create secret work directory: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error("cannot use credentials with URL {0}")]
    UnsupportedUrl(String),
}

/// Outcome of applying a source secret
#[derive(Debug)]
pub struct ScmAuthSetup {
    /// `NAME=value` entries to add to git's environment
    pub env: Vec<String>,
    /// Source URI to clone instead of the descriptor's
    pub override_uri: Option<String>,
    /// Names of the methods that were applied
    pub applied: Vec<&'static str>,
    workdir: TempDir,
}

impl ScmAuthSetup {
    /// Directory holding generated scripts and config
    pub fn workdir(&self) -> &Path {
        self.workdir.path()
    }
}

/// Apply the secrets in `secret_dir` for cloning `url`.
pub fn setup(url: &GitUrl, secret_dir: &Path) -> Result<ScmAuthSetup, ScmAuthError> {
    // Fail early on an unreadable or missing mount
    fs::read_dir(secret_dir).map_err(|source| ScmAuthError::Read {
        path: secret_dir.to_path_buf(),
        source,
    })?;

    let workdir = tempfile::Builder::new()
        .prefix("git-secret")
        .tempdir()
        .map_err(ScmAuthError::WorkDir)?;
    let mut setup = ScmAuthSetup {
        env: Vec::new(),
        override_uri: None,
        applied: Vec::new(),
        workdir,
    };
    let mut global_config = String::new();

    let secret = |name: &str| Some(secret_dir.join(name)).filter(|p| p.is_file());

    if let Some(key) = secret(SSH_PRIVATE_KEY).filter(|_| url.is_ssh()) {
        let script = ssh_wrapper(setup.workdir(), &key, secret(KNOWN_HOSTS).as_deref())?;
        setup.env.push(format!("GIT_SSH={}", script.display()));
        setup.applied.push(SSH_PRIVATE_KEY);
    }

    if url.is_http() {
        let username = secret(USERNAME).map(|p| read_trimmed(&p)).transpose()?;
        let password = secret(PASSWORD).map(|p| read_trimmed(&p)).transpose()?;
        if let Some(user) = username.as_deref().filter(|u| !u.is_empty()) {
            let with_user = url
                .with_username(user)
                .ok_or_else(|| ScmAuthError::UnsupportedUrl(url.to_string()))?;
            setup.override_uri = Some(with_user.to_string());
            setup.applied.push(USERNAME);
        }
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            let user = username
                .as_deref()
                .filter(|u| !u.is_empty())
                .or_else(|| url.username())
                .unwrap_or("builder");
            let line = url
                .credential_line(user, &password)
                .ok_or_else(|| ScmAuthError::UnsupportedUrl(url.to_string()))?;
            let store = setup.workdir().join(".git-credentials");
            write_private(&store, format!("{line}\n").as_bytes(), 0o600)?;
            global_config.push_str(&format!(
                "[credential]\n\thelper = store --file={}\n",
                store.display()
            ));
            setup.applied.push(PASSWORD);
        }
    }

    if let Some(ca) = secret(CA_CERT).filter(|_| url.is_https()) {
        setup.env.push(format!("GIT_SSL_CAINFO={}", ca.display()));
        setup.applied.push(CA_CERT);
    }

    if let Some(config) = secret(GIT_CONFIG) {
        global_config.push_str(&format!("[include]\n\tpath = {}\n", config.display()));
        setup.applied.push(GIT_CONFIG);
    }

    if !global_config.is_empty() {
        let path = setup.workdir().join(".gitconfig");
        write_private(&path, global_config.as_bytes(), 0o600)?;
        setup.env.push(format!("GIT_CONFIG_GLOBAL={}", path.display()));
    }

    tracing::debug!(methods = ?setup.applied, "source secret applied");
    Ok(setup)
}

/// Write a script running ssh with `key`, strict about hosts only when a
/// known-hosts file is supplied.
fn ssh_wrapper(workdir: &Path, key: &Path, known_hosts: Option<&Path>) -> Result<PathBuf, ScmAuthError> {
    // ssh refuses keys readable by others; the mounted copy may be
    let key_copy = workdir.join("ssh-privatekey");
    let key_bytes = fs::read(key).map_err(|source| ScmAuthError::Read {
        path: key.to_path_buf(),
        source,
    })?;
    write_private(&key_copy, &key_bytes, 0o600)?;

    let host_options = match known_hosts {
        Some(hosts) => format!(
            "-o StrictHostKeyChecking=yes -o UserKnownHostsFile={}",
            hosts.display()
        ),
        None => "-o StrictHostKeyChecking=no -o UserKnownHostsFile=/dev/null".to_string(),
    };
    let script = format!(
        "#!/bin/sh\nexec ssh -i {} -o IdentitiesOnly=yes {} \"$@\"\n",
        key_copy.display(),
        host_options
    );
    let path = workdir.join("ssh-wrapper.sh");
    write_private(&path, script.as_bytes(), 0o700)?;
    Ok(path)
}

fn read_trimmed(path: &Path) -> Result<String, ScmAuthError> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ScmAuthError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn write_private(path: &Path, contents: &[u8], mode: u32) -> Result<(), ScmAuthError> {
    let write_err = |source| ScmAuthError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(mode)
        .open(path)
        .map_err(write_err)?;
    file.write_all(contents).map_err(write_err)?;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(write_err)
}

#[cfg(test)]
#[path = "scmauth_tests.rs"]
mod tests;
