//! Invocation dispatch specs
//!
//! The build kind comes from the subcommand or the executable's name.

use crate::prelude::*;

#[test]
fn help_lists_every_kind() {
    let run = cli().args(&["--help"]).passes();
    for kind in [
        "git-clone",
        "docker-build",
        "sti-build",
        "manage-dockerfile",
        "extract-image-content",
    ] {
        assert!(run.stdout().contains(kind), "help lacks {kind}:\n{}", run.stdout());
    }
}

#[test]
fn version_flag_passes() {
    cli().args(&["--version"]).passes().stdout_has("buildworker");
}

#[test]
fn loglevel_out_of_range_is_rejected() {
    cli().args(&["git-clone", "--loglevel", "42"]).fails();
}

#[test]
fn symlink_name_selects_kind() {
    let dir = tempfile::tempdir().unwrap();
    let link = dir.path().join("buildworker-git-clone");
    std::os::unix::fs::symlink(worker_binary(), &link).unwrap();

    // Dispatch reached session setup, which needs a descriptor
    cli()
        .program(&link)
        .fails()
        .stderr_has("unable to parse build string")
        .stderr_lacks("no build kind given");
}

#[test]
fn unknown_symlink_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let link = dir.path().join("buildworker-frobnicate");
    std::os::unix::fs::symlink(worker_binary(), &link).unwrap();

    cli().program(&link).fails().stderr_has("no build kind given");
}
