// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build descriptor: the specification and mutable status of one build attempt.
//!
//! The descriptor arrives as JSON in the worker's environment. Field names
//! follow the cluster API's camelCase convention so the same document can be
//! sent back with the status report.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status::BuildStatus;

/// The only `kind` accepted when the descriptor declares one.
pub const BUILD_KIND: &str = "Build";

/// Errors decoding a serialized descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("unable to parse build string: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("build string is not a build: kind {0:?}")]
    NotABuild(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: BuildSpec,
    #[serde(default)]
    pub status: BuildStatus,
}

impl Build {
    /// Decode a descriptor, rejecting documents of another kind.
    pub fn from_json(input: &str) -> Result<Self, DescriptorError> {
        let build: Build = serde_json::from_str(input)?;
        match build.kind.as_deref() {
            None | Some(BUILD_KIND) => Ok(build),
            Some(other) => Err(DescriptorError::NotABuild(other.to_string())),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    /// Output image reference, when the build pushes one.
    pub fn output_image(&self) -> Option<&str> {
        self.spec
            .output
            .to
            .as_ref()
            .map(|to| to.name.as_str())
            .filter(|name| !name.is_empty())
    }

    /// Commit resolved for this build, if any.
    pub fn source_commit(&self) -> Option<&str> {
        self.spec
            .revision
            .as_ref()
            .and_then(|rev| rev.git.as_ref())
            .map(|git| git.commit.as_str())
            .filter(|commit| !commit.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSpec {
    #[serde(default)]
    pub source: BuildSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<SourceRevision>,
    #[serde(default)]
    pub strategy: BuildStrategySpec,
    #[serde(default)]
    pub output: BuildOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitBuildSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary: Option<BinaryBuildSource>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context_dir: String,
    /// Inline Dockerfile content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_secret: Option<SecretRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitBuildSource {
    pub uri: String,
    #[serde(default, rename = "ref", skip_serializing_if = "String::is_empty")]
    pub git_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_proxy: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryBuildSource {
    /// When set, the payload is stored under this file name instead of
    /// being unpacked as an archive.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub as_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub from: ObjectReference,
    #[serde(default)]
    pub paths: Vec<ImageSourcePath>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSourcePath {
    pub source_path: String,
    #[serde(default)]
    pub destination_dir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRevision {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<GitSourceRevision>,
}

impl SourceRevision {
    pub fn git(revision: GitSourceRevision) -> Self {
        Self {
            kind: "Git".to_string(),
            git: Some(revision),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitSourceRevision {
    #[serde(default)]
    pub commit: String,
    #[serde(default)]
    pub author: SourceControlUser,
    #[serde(default)]
    pub committer: SourceControlUser,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceControlUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStrategySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_strategy: Option<DockerStrategyOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_strategy: Option<SourceStrategyOptions>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerStrategyOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_args: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dockerfile_path: String,
    #[serde(default)]
    pub no_cache: bool,
    #[serde(default)]
    pub force_pull: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStrategyOptions {
    pub from: ObjectReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,
    #[serde(default)]
    pub force_pull: bool,
}

/// A single `NAME=value` pair carried by the descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_secret: Option<SecretRef>,
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
