// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build status vocabulary consumed by the cluster API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::timing::StageInfo;

/// Lifecycle phase of a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildPhase {
    #[default]
    New,
    Pending,
    Running,
    Complete,
    Failed,
    Error,
    Cancelled,
}

impl BuildPhase {
    /// Failure phases are sticky for the rest of a session.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            BuildPhase::Failed | BuildPhase::Error | BuildPhase::Cancelled
        )
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildPhase::New => "New",
            BuildPhase::Pending => "Pending",
            BuildPhase::Running => "Running",
            BuildPhase::Complete => "Complete",
            BuildPhase::Failed => "Failed",
            BuildPhase::Error => "Error",
            BuildPhase::Cancelled => "Cancelled",
        };
        f.write_str(s)
    }
}

/// Machine-readable reason attached to a failed build.
///
/// Reasons the worker sets itself have dedicated variants; anything else
/// received from the control plane round-trips through `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatusReason {
    FetchSourceFailed,
    InvalidContextDirectory,
    FetchImageContentFailed,
    GenericBuildFailed,
    DockerBuildFailed,
    PushImageToRegistryFailed,
    Other(String),
}

impl StatusReason {
    pub fn as_str(&self) -> &str {
        match self {
            StatusReason::FetchSourceFailed => "FetchSourceFailed",
            StatusReason::InvalidContextDirectory => "InvalidContextDirectory",
            StatusReason::FetchImageContentFailed => "FetchImageContentFailed",
            StatusReason::GenericBuildFailed => "GenericBuildFailed",
            StatusReason::DockerBuildFailed => "DockerBuildFailed",
            StatusReason::PushImageToRegistryFailed => "PushImageToRegistryFailed",
            StatusReason::Other(s) => s,
        }
    }

    /// Human message paired with the reason in status reports.
    pub fn message(&self) -> &str {
        match self {
            StatusReason::FetchSourceFailed => "Failed to fetch the input source.",
            StatusReason::InvalidContextDirectory => {
                "The supplied context directory does not exist."
            }
            StatusReason::FetchImageContentFailed => "Failed to extract image content.",
            StatusReason::GenericBuildFailed => "Generic Build failure - check logs for details.",
            StatusReason::DockerBuildFailed => "Docker build strategy has failed.",
            StatusReason::PushImageToRegistryFailed => "Failed to push the image to the registry.",
            StatusReason::Other(_) => "",
        }
    }
}

impl From<String> for StatusReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "FetchSourceFailed" => StatusReason::FetchSourceFailed,
            "InvalidContextDirectory" => StatusReason::InvalidContextDirectory,
            "FetchImageContentFailed" => StatusReason::FetchImageContentFailed,
            "GenericBuildFailed" => StatusReason::GenericBuildFailed,
            "DockerBuildFailed" => StatusReason::DockerBuildFailed,
            "PushImageToRegistryFailed" => StatusReason::PushImageToRegistryFailed,
            _ => StatusReason::Other(s),
        }
    }
}

impl From<StatusReason> for String {
    fn from(reason: StatusReason) -> Self {
        reason.as_str().to_string()
    }
}

impl fmt::Display for StatusReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable status sub-record of a build descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default)]
    pub phase: BuildPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageInfo>,
}

impl BuildStatus {
    pub fn is_failed(&self) -> bool {
        self.phase.is_failure()
    }

    /// Mark the build failed with `reason`.
    ///
    /// The first failure of a session wins: returns `false` and leaves the
    /// status untouched if a failure phase is already recorded.
    pub fn fail(&mut self, reason: StatusReason) -> bool {
        if self.is_failed() {
            return false;
        }
        self.phase = BuildPhase::Failed;
        self.message = reason.message().to_string();
        self.reason = Some(reason);
        true
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
