// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Build worker execution core

pub mod certs;
pub mod cgroup;
pub mod config;
pub mod dockerfile;
pub mod env;
mod error;
pub mod giturl;
pub mod invocation;
mod orchestrator;
pub mod scmauth;
pub mod source;

pub use certs::{default_ca_certs, install_ca_certs, CaCert, CertError};
pub use cgroup::{CgroupDiscovery, CgroupError, CgroupPaths};
pub use config::{ClusterReporter, ConfigError, SessionConfig};
pub use env::{EngineMode, Verbosity, WorkerEnv};
pub use error::WorkerError;
pub use invocation::Invocation;
pub use orchestrator::{ExecuteOutcome, Orchestrator, NO_PUSH_MESSAGE};
pub use source::SourceError;
