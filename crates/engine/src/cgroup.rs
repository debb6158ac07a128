// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource limits derived from the cgroup the worker runs under.
//!
//! Only the v1 hierarchy layout is understood: one directory per controller
//! below the cgroup root, and `id:controllers:path` records in
//! `/proc/self/cgroup`.

use bw_core::{ContainerIdentity, Limit, ResourceLimits};
use regex::Regex;
use std::collections::HashMap;
use std::io::BufRead;
use std::num::{IntErrorKind, ParseIntError};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

/// Controller whose path locates the build's cgroup parent
const MEMORY_CONTROLLER: &str = "memory";

/// Controllers consulted for the container identity, in preference order
const IDENTITY_CONTROLLERS: &[&str] = &["net_cls", "cpu"];

/// Runtime tag assumed when a cgroup path carries no `<tag>-` prefix
const DEFAULT_RUNTIME: &str = "docker";

/// One `/proc/self/cgroup` line: controller list, optional `<tag>-` prefix
/// and trailing identifier of the last path segment
#[allow(clippy::expect_used)]
static PROC_CGROUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+:([a-z_,]+):/.*/(\w+-|)([a-z0-9]+).*")
        .expect("constant regex pattern is valid")
});

/// Errors discovering resource limits
#[derive(Debug, Error)]
pub enum CgroupError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("value {text:?} is out of range (minimum {value})")]
    Underflow { value: i64, text: String },
    #[error("invalid integer {text:?}: {source}")]
    Parse {
        text: String,
        #[source]
        source: ParseIntError,
    },
    #[error("malformed cgroup record: {0:?}")]
    MalformedRecord(String),
    #[error("could not find memory cgroup subsystem in map {0:?}")]
    MissingMemoryController(HashMap<String, String>),
    #[error("unprocessable cgroup memory value: {0}")]
    UnprocessableMemoryPath(String),
}

/// Locations of the cgroup record and hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupPaths {
    /// The process's cgroup membership record
    pub self_cgroup: PathBuf,
    /// Mount point of the controller hierarchies
    pub root: PathBuf,
}

impl Default for CgroupPaths {
    fn default() -> Self {
        Self {
            self_cgroup: PathBuf::from("/proc/self/cgroup"),
            root: PathBuf::from("/sys/fs/cgroup"),
        }
    }
}

impl CgroupPaths {
    fn control_file(&self, controller: &str, file: &str) -> PathBuf {
        self.root.join(controller).join(file)
    }
}

/// Result of [`discover`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupDiscovery {
    pub limits: ResourceLimits,
    pub container: ContainerIdentity,
}

/// Parse a control-file value as a signed 64-bit integer.
///
/// Values above the range saturate to `i64::MAX` without error. Values
/// below it fail with [`CgroupError::Underflow`] carrying `i64::MIN`.
pub fn parse_int64(text: &str) -> Result<i64, CgroupError> {
    let s = text.trim();
    match s.parse::<i64>() {
        Ok(value) => Ok(value),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => Ok(i64::MAX),
            IntErrorKind::NegOverflow => Err(CgroupError::Underflow {
                value: i64::MIN,
                text: s.to_string(),
            }),
            _ => Err(CgroupError::Parse {
                text: s.to_string(),
                source: e,
            }),
        },
    }
}

/// Read and parse a control file holding one integer.
pub fn read_int64(path: &Path) -> Result<i64, CgroupError> {
    let text = std::fs::read_to_string(path).map_err(|source| CgroupError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_int64(&text)
}

/// Container identity from a `/proc/self/cgroup` record.
///
/// The `net_cls` controller is preferred, then `cpu`. Unreadable lines are
/// skipped; no matching entry yields an empty identifier.
pub fn read_net_cls_cgroup<R: BufRead>(reader: R) -> ContainerIdentity {
    let mut by_controller: HashMap<String, ContainerIdentity> = HashMap::new();
    for line in reader.lines().map_while(Result::ok) {
        let Some(caps) = PROC_CGROUP_PATTERN.captures(&line) else {
            continue;
        };
        let tag = caps.get(2).map_or("", |m| m.as_str()).trim_end_matches('-');
        let identity = ContainerIdentity {
            id: caps.get(3).map_or("", |m| m.as_str()).to_string(),
            runtime: if tag.is_empty() {
                DEFAULT_RUNTIME.to_string()
            } else {
                tag.to_string()
            },
        };
        let controllers = caps.get(1).map_or("", |m| m.as_str());
        for controller in controllers.split(',') {
            by_controller.insert(controller.to_string(), identity.clone());
        }
    }

    IDENTITY_CONTROLLERS
        .iter()
        .find_map(|name| by_controller.remove(*name))
        .unwrap_or_else(|| ContainerIdentity {
            id: String::new(),
            runtime: DEFAULT_RUNTIME.to_string(),
        })
}

/// Map each controller named in a `/proc/self/cgroup` record to its path.
pub fn parse_cgroup_file<R: BufRead>(reader: R) -> Result<HashMap<String, String>, CgroupError> {
    let mut map = HashMap::new();
    for line in reader.lines() {
        let line = line.map_err(|source| CgroupError::Read {
            path: PathBuf::from("<cgroup record>"),
            source,
        })?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.splitn(3, ':').collect();
        let [_, controllers, path] = parts.as_slice() else {
            return Err(CgroupError::MalformedRecord(line.to_string()));
        };
        for controller in controllers.split(',') {
            map.insert(controller.to_string(), path.to_string());
        }
    }
    Ok(map)
}

/// Cgroup parent for the build's containers, from the `memory` entry.
///
/// A systemd `.scope` path yields its second-to-last segment; any other
/// path yields everything but its last segment.
pub fn extract_parent_from_cgroup_map(map: &HashMap<String, String>) -> Result<String, CgroupError> {
    let memory = map
        .get(MEMORY_CONTROLLER)
        .ok_or_else(|| CgroupError::MissingMemoryController(map.clone()))?;
    tracing::trace!(memory = %memory, "cgroup memory subsystem value");

    let parts: Vec<&str> = memory.split('/').collect();
    if parts.len() < 2 {
        return Err(CgroupError::UnprocessableMemoryPath(memory.clone()));
    }
    let parent = if memory.ends_with(".scope") {
        parts[parts.len() - 2].to_string()
    } else {
        parts[..parts.len() - 1].join("/")
    };
    tracing::debug!(parent = %parent, "found cgroup parent");
    Ok(parent)
}

/// Read an optional CPU control file; absent files mean no limit.
fn read_cpu_limit(path: &Path) -> Result<Limit, CgroupError> {
    if !path.exists() {
        return Ok(Limit::Unbounded);
    }
    read_int64(path).map(Limit::cpu)
}

/// Discover the resource limits and container identity of this process.
pub fn discover(paths: &CgroupPaths) -> Result<CgroupDiscovery, CgroupError> {
    let memory_bytes = read_int64(&paths.control_file("memory", "memory.limit_in_bytes"))?;
    let memory = Limit::memory(memory_bytes);

    let record = std::fs::read(&paths.self_cgroup).map_err(|source| CgroupError::Read {
        path: paths.self_cgroup.clone(),
        source,
    })?;
    let parent = extract_parent_from_cgroup_map(&parse_cgroup_file(record.as_slice())?)?;
    let container = read_net_cls_cgroup(record.as_slice());

    let limits = ResourceLimits {
        cpu_shares: read_cpu_limit(&paths.control_file("cpu", "cpu.shares"))?,
        cpu_quota: read_cpu_limit(&paths.control_file("cpu", "cpu.cfs_quota_us"))?,
        cpu_period: read_cpu_limit(&paths.control_file("cpu", "cpu.cfs_period_us"))?,
        memory_limit_bytes: memory,
        // No swapping beyond the memory limit
        memory_swap: memory,
        parent: Some(parent),
    };
    Ok(CgroupDiscovery { limits, container })
}

#[cfg(test)]
#[path = "cgroup_tests.rs"]
mod tests;
