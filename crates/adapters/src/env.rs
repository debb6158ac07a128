// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|s| !s.is_empty())
}

/// In-cluster API server host (`KUBERNETES_SERVICE_HOST`).
pub fn kubernetes_service_host() -> Option<String> {
    non_empty("KUBERNETES_SERVICE_HOST")
}

/// In-cluster API server port (`KUBERNETES_SERVICE_PORT`).
pub fn kubernetes_service_port() -> Option<String> {
    non_empty("KUBERNETES_SERVICE_PORT")
}
