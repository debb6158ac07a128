// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource constraints applied to the build the worker performs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest memory limit handed to a build engine (about 92 TB). Values at or
/// beyond it are treated as unbounded.
pub const MEMORY_LIMIT_CEILING: i64 = 92_233_720_368_547;

/// A single resource constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    Value(i64),
    Unbounded,
}

impl Limit {
    /// Interpret a raw control-file value; the saturated maximum means
    /// no limit.
    pub fn from_raw(raw: i64) -> Self {
        if raw == i64::MAX {
            Limit::Unbounded
        } else {
            Limit::Value(raw)
        }
    }

    /// Interpret a memory control-file value.
    pub fn memory(raw: i64) -> Self {
        if raw >= MEMORY_LIMIT_CEILING {
            Limit::Unbounded
        } else {
            Limit::Value(raw)
        }
    }

    /// Interpret a CPU control-file value; non-positive values (such as a
    /// quota of `-1`) mean no limit.
    pub fn cpu(raw: i64) -> Self {
        if raw <= 0 {
            Limit::Unbounded
        } else {
            Limit::from_raw(raw)
        }
    }

    pub fn value(self) -> Option<i64> {
        match self {
            Limit::Value(v) => Some(v),
            Limit::Unbounded => None,
        }
    }

    pub fn is_unbounded(self) -> bool {
        matches!(self, Limit::Unbounded)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Value(v) => write!(f, "{v}"),
            Limit::Unbounded => f.write_str("unbounded"),
        }
    }
}

/// CPU and memory constraints derived from the worker's own cgroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub cpu_shares: Limit,
    pub cpu_quota: Limit,
    pub cpu_period: Limit,
    pub memory_limit_bytes: Limit,
    pub memory_swap: Limit,
    /// Cgroup the build's containers are placed under
    pub parent: Option<String>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            cpu_shares: Limit::Unbounded,
            cpu_quota: Limit::Unbounded,
            cpu_period: Limit::Unbounded,
            memory_limit_bytes: Limit::Unbounded,
            memory_swap: Limit::Unbounded,
            parent: None,
        }
    }
}

/// Identity of the container the worker runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerIdentity {
    /// Container identifier taken from the cgroup record (empty if unknown)
    pub id: String,
    /// Container engine managing the cgroup, e.g. `docker` or `crio`
    pub runtime: String,
}

#[cfg(test)]
#[path = "limits_tests.rs"]
mod tests;
