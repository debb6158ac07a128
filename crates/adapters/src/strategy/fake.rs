// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake build strategy for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{BuildContext, BuildStrategy, StrategyError};
use async_trait::async_trait;
use bw_core::{ResourceLimits, StatusReason};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Recorded strategy invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyCall {
    pub build_name: String,
    pub limits: ResourceLimits,
    pub input_dir: PathBuf,
}

#[derive(Default)]
struct FakeStrategyState {
    calls: Vec<StrategyCall>,
    error: Option<String>,
    reason: Option<StatusReason>,
    panic: Option<String>,
}

/// Fake strategy recording each invocation.
#[derive(Clone, Default)]
pub struct FakeStrategy {
    inner: Arc<Mutex<FakeStrategyState>>,
}

impl FakeStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every build with `message`
    pub fn failing(self, message: &str) -> Self {
        self.inner.lock().error = Some(message.to_string());
        self
    }

    /// When failing, also mark the descriptor with `reason`
    pub fn with_reason(self, reason: StatusReason) -> Self {
        self.inner.lock().reason = Some(reason);
        self
    }

    /// Panic with `message` inside every build
    pub fn panicking(self, message: &str) -> Self {
        self.inner.lock().panic = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<StrategyCall> {
        self.inner.lock().calls.clone()
    }
}

#[async_trait]
impl BuildStrategy for FakeStrategy {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn build<'a>(&self, mut ctx: BuildContext<'a>) -> Result<(), StrategyError> {
        let mut inner = self.inner.lock();
        inner.calls.push(StrategyCall {
            build_name: ctx.build.name().to_string(),
            limits: ctx.limits.clone(),
            input_dir: ctx.input_dir.to_path_buf(),
        });
        if let Some(message) = inner.panic.clone() {
            drop(inner);
            blow_up(&message);
        }
        let Some(message) = inner.error.clone() else {
            return Ok(());
        };
        if let Some(reason) = inner.reason.clone() {
            ctx.build.status.fail(reason);
        }
        Err(StrategyError::Other(message))
    }
}

#[allow(clippy::panic)]
fn blow_up(message: &str) -> ! {
    panic!("{message}")
}
