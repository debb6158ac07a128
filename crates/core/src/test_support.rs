// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    BinaryBuildSource, Build, BuildSource, BuildSpec, DockerStrategyOptions, EnvVar,
    GitBuildSource, ObjectMeta, ObjectReference, SecretRef,
};

// ── Descriptor factory functions ────────────────────────────────────────────

/// Minimal descriptor with no source and no output.
pub fn empty_build(name: &str, namespace: &str) -> Build {
    Build {
        kind: Some("Build".to_string()),
        api_version: Some("build.openshift.io/v1".to_string()),
        metadata: ObjectMeta {
            name: name.to_string(),
            namespace: namespace.to_string(),
            resource_version: None,
        },
        spec: BuildSpec::default(),
        status: Default::default(),
    }
}

/// Descriptor cloning `uri` with no secret, proxies or context dir.
pub fn git_build(name: &str, uri: &str) -> Build {
    let mut build = empty_build(name, "test-ns");
    build.spec.source = BuildSource {
        git: Some(GitBuildSource {
            uri: uri.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    build
}

/// Descriptor whose git source uses a source secret.
pub fn git_build_with_secret(name: &str, uri: &str, secret: &str) -> Build {
    let mut build = git_build(name, uri);
    build.spec.source.source_secret = Some(SecretRef {
        name: secret.to_string(),
    });
    build
}

/// Descriptor whose only input is a binary payload stored as `as_file`.
pub fn binary_build(name: &str, as_file: &str) -> Build {
    let mut build = empty_build(name, "test-ns");
    build.spec.source.binary = Some(BinaryBuildSource {
        as_file: as_file.to_string(),
    });
    build
}

/// Descriptor for a docker strategy build pushing to `output`.
pub fn docker_build(name: &str, output: Option<&str>) -> Build {
    let mut build = git_build(name, "https://example.com/app.git");
    build.spec.strategy.docker_strategy = Some(DockerStrategyOptions {
        env: vec![EnvVar::new("APP_ENV", "test")],
        ..Default::default()
    });
    build.spec.output.to = output.map(|name| ObjectReference {
        kind: "DockerImage".to_string(),
        name: name.to_string(),
        namespace: None,
    });
    build
}
