// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log output and panic handling for the worker process.

use bw_engine::Verbosity;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter for the session: `RUST_LOG` when set and valid, else the
/// verbosity's level.
pub fn filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber writing to stderr. Stdout stays free for
/// the build's own output.
pub fn init(verbosity: Verbosity) {
    tracing_subscriber::registry()
        .with(filter(verbosity))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Log panics through tracing; with `crash` the process aborts right after.
pub fn install_panic_hook(crash: bool) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "worker panicked");
        if crash {
            std::process::abort();
        }
        default_hook(info);
    }));
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
