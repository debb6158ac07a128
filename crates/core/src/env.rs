// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `NAME=value` environment list helpers.

use std::collections::HashSet;

/// Variable name of an environment entry: the text before the first `=`,
/// or the whole entry when it has none.
pub fn env_name(entry: &str) -> &str {
    match entry.find('=') {
        Some(i) => &entry[..i],
        None => entry,
    }
}

/// Merge two environment lists; entries in `new` override same-named
/// entries in `old`.
///
/// The result holds every entry of `new` in order, followed by the entries
/// of `old` whose names do not appear in `new`, in their original order.
pub fn merge_env(old: &[String], new: &[String]) -> Vec<String> {
    let overridden: HashSet<&str> = new.iter().map(|e| env_name(e)).collect();
    new.iter()
        .cloned()
        .chain(
            old.iter()
                .filter(|e| !overridden.contains(env_name(e)))
                .cloned(),
        )
        .collect()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
