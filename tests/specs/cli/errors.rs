//! CLI error handling specs
//!
//! Every failure exits with status 1 and leaves stdout empty.

use crate::prelude::*;

#[test]
fn missing_build_exits_one() {
    cli()
        .args(&["git-clone"])
        .fails()
        .stderr_has("unable to parse build string")
        .stdout_empty();
}

#[test]
fn undecodable_build_exits_one() {
    cli()
        .args(&["manage-dockerfile"])
        .env("BUILD", "{not json")
        .fails()
        .stderr_has("unable to parse build string");
}

#[test]
fn non_build_descriptor_is_rejected() {
    cli()
        .args(&["git-clone"])
        .env("BUILD", r#"{"kind":"Pod","metadata":{"name":"p","namespace":"ns"}}"#)
        .fails()
        .stderr_has("build string is not a build");
}

#[test]
fn unknown_kind_is_rejected() {
    cli()
        .args(&["frobnicate"])
        .fails()
        .stderr_has("unrecognized subcommand");
}

#[test]
fn no_kind_is_rejected() {
    cli().fails().stderr_has("no build kind given");
}

#[test]
fn missing_cluster_fails_before_any_work() {
    cli()
        .args(&["git-clone"])
        .env("BUILD", &git_build_json("https://example.com/app.git"))
        .fails()
        .stderr_has("cannot connect to the server")
        .stderr_lacks("cloning source");
}

#[test]
fn bad_daemon_endpoint_is_a_configuration_error() {
    cli()
        .args(&["docker-build"])
        .env("BUILD", &git_build_json("https://example.com/app.git"))
        .env("DOCKER_HOST", "not a url")
        .fails()
        .stderr_has("no Docker configuration defined");
}
