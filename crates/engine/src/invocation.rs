// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The kinds of work one worker process can be asked to do.

use std::fmt;

/// Prefix of the per-kind symlink names, e.g. `buildworker-git-clone`
pub const BINARY_PREFIX: &str = "buildworker-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    GitClone,
    DockerBuild,
    StiBuild,
    ManageDockerfile,
    ExtractImageContent,
}

impl Invocation {
    pub const ALL: [Invocation; 5] = [
        Invocation::GitClone,
        Invocation::DockerBuild,
        Invocation::StiBuild,
        Invocation::ManageDockerfile,
        Invocation::ExtractImageContent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Invocation::GitClone => "git-clone",
            Invocation::DockerBuild => "docker-build",
            Invocation::StiBuild => "sti-build",
            Invocation::ManageDockerfile => "manage-dockerfile",
            Invocation::ExtractImageContent => "extract-image-content",
        }
    }

    /// Whether the session needs a container engine client
    pub fn needs_engine(self) -> bool {
        matches!(
            self,
            Invocation::DockerBuild | Invocation::StiBuild | Invocation::ExtractImageContent
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Kind selected by the executable's file name, either `<kind>` or
    /// `buildworker-<kind>`.
    pub fn from_basename(basename: &str) -> Option<Self> {
        let name = basename.strip_prefix(BINARY_PREFIX).unwrap_or(basename);
        Self::from_name(name)
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "invocation_tests.rs"]
mod tests;
