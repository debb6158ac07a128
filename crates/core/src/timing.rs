// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage and step timing recorded during a build session.
//!
//! A [`Timings`] recorder lives for one orchestration entry point. Its stages
//! are merged into the descriptor's status right before the status report.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse build stages reported to the control plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    FetchInputs,
    Build,
    PushImage,
}

impl StageName {
    pub fn as_str(self) -> &'static str {
        match self {
            StageName::FetchInputs => "FetchInputs",
            StageName::Build => "Build",
            StageName::PushImage => "PushImage",
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual steps within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepName {
    FetchGitSource,
    ExtractBinarySource,
    FetchImageContent,
    DockerBuild,
    GenerateDockerfile,
    PushImage,
}

impl StepName {
    pub fn as_str(self) -> &'static str {
        match self {
            StepName::FetchGitSource => "FetchGitSource",
            StepName::ExtractBinarySource => "ExtractBinarySource",
            StepName::FetchImageContent => "FetchImageContent",
            StepName::DockerBuild => "DockerBuild",
            StepName::GenerateDockerfile => "GenerateDockerfile",
            StepName::PushImage => "PushImage",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub duration_milliseconds: i64,
}


#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageInfo {
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub duration_milliseconds: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepInfo>,
}

impl StageInfo {
    /// End of the stage. Negative durations count as zero and an end past
    /// the representable range saturates.
    fn end_time(&self) -> DateTime<Utc> {
        TimeDelta::try_milliseconds(self.duration_milliseconds.max(0))
            .and_then(|d| self.start_time.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Widen this stage to cover `other` and take over its steps.
    fn absorb(&mut self, other: &StageInfo) {
        let start = self.start_time.min(other.start_time);
        let end = self.end_time().max(other.end_time());
        self.start_time = start;
        self.duration_milliseconds = end.signed_duration_since(start).num_milliseconds();
        self.steps.extend(other.steps.iter().cloned());
    }
}

/// Ordered stage recorder for a single orchestration context.
#[derive(Debug, Clone, Default)]
pub struct Timings {
    stages: Vec<StageInfo>,
}

impl Timings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed step. Steps of a stage already on record extend
    /// that stage; otherwise a new stage is appended.
    pub fn record_step(
        &mut self,
        stage: StageName,
        step: StepName,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) {
        let step = StepInfo {
            name: step.as_str().to_string(),
            start_time: start,
            duration_milliseconds: (end - start).num_milliseconds().max(0),
        };
        let recorded = StageInfo {
            name: stage.as_str().to_string(),
            start_time: step.start_time,
            duration_milliseconds: step.duration_milliseconds,
            steps: vec![step],
        };
        match self.stages.iter_mut().find(|s| s.name == recorded.name) {
            Some(existing) => existing.absorb(&recorded),
            None => self.stages.push(recorded),
        }
    }

    pub fn stages(&self) -> &[StageInfo] {
        &self.stages
    }

    pub fn into_stages(self) -> Vec<StageInfo> {
        self.stages
    }
}

/// Merge newly recorded stages into those already on a descriptor.
///
/// Same-named stages collapse into one covering both time ranges; new
/// stage names are appended in order.
pub fn append_stage_and_step_info(existing: &[StageInfo], recorded: &[StageInfo]) -> Vec<StageInfo> {
    let mut merged = existing.to_vec();
    for stage in recorded {
        match merged.iter_mut().find(|s| s.name == stage.name) {
            Some(current) => current.absorb(stage),
            None => merged.push(stage.clone()),
        }
    }
    merged
}

#[cfg(test)]
#[path = "timing_tests.rs"]
mod tests;
