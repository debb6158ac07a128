// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake status reporter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ReportError, StatusReporter};
use async_trait::async_trait;
use bw_core::Build;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct FakeReporterState {
    reports: Vec<Build>,
    error: Option<String>,
}

/// Fake reporter keeping a copy of every descriptor it was sent.
#[derive(Clone, Default)]
pub struct FakeStatusReporter {
    inner: Arc<Mutex<FakeReporterState>>,
}

impl FakeStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every report with `message` (reports are still recorded)
    pub fn failing(self, message: &str) -> Self {
        self.inner.lock().error = Some(message.to_string());
        self
    }

    /// Descriptors received, in order
    pub fn reports(&self) -> Vec<Build> {
        self.inner.lock().reports.clone()
    }
}

#[async_trait]
impl StatusReporter for FakeStatusReporter {
    async fn update_details(&self, build: &Build) -> Result<(), ReportError> {
        let mut inner = self.inner.lock();
        inner.reports.push(build.clone());
        match &inner.error {
            Some(message) => Err(ReportError::Failed(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
