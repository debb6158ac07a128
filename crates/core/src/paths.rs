// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Descriptor-supplied paths resolved below a local directory.

use std::path::{Component, Path, PathBuf};

/// Join `parts` onto `root` lexically: a leading `/` does not replace
/// `root`, and `..` steps back over earlier segments.
///
/// Returns `None` when a `..` would climb above `root`.
pub fn join_within<'a>(root: &Path, parts: impl IntoIterator<Item = &'a str>) -> Option<PathBuf> {
    let mut segments = Vec::new();
    for part in parts {
        for component in Path::new(part).components() {
            match component {
                Component::Normal(segment) => segments.push(segment),
                Component::ParentDir => {
                    segments.pop()?;
                }
                Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            }
        }
    }
    let mut path = root.to_path_buf();
    path.extend(segments);
    Some(path)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
