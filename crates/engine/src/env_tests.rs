// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn empty_environment_selects_embedded_engine() {
    let env = WorkerEnv::from_vars(Vec::new());
    assert_eq!(env.build, "");
    assert_eq!(env.source_secret_path, None);
    assert_eq!(env.engine, EngineMode::Embedded(EmbeddedOptions::default()));
    assert_eq!(env.log_level, None);
    assert!(!env.crash_on_panic);
}

#[test]
fn docker_host_selects_daemon() {
    let env = WorkerEnv::from_vars(vars(&[("DOCKER_HOST", "tcp://10.0.0.5:2375")]));
    assert_eq!(
        env.engine,
        EngineMode::Daemon {
            endpoint: "tcp://10.0.0.5:2375".to_string()
        }
    );
}

#[test]
fn empty_docker_host_uses_default_socket() {
    let env = WorkerEnv::from_vars(vars(&[
        ("DOCKER_HOST", ""),
        ("BUILD_STORAGE_DRIVER", "vfs"),
    ]));
    assert_eq!(
        env.engine,
        EngineMode::Daemon {
            endpoint: DEFAULT_DAEMON_ENDPOINT.to_string()
        }
    );
}

#[test]
fn embedded_overrides_are_collected() {
    let env = WorkerEnv::from_vars(vars(&[
        ("BUILD_STORAGE_DRIVER", "vfs"),
        ("BUILD_STORAGE_CONF_PATH", "/etc/containers/storage.conf"),
        ("BUILD_REGISTRIES_CONF_PATH", "/etc/containers/registries.conf"),
        ("BUILD_REGISTRIES_DIR_PATH", ""),
        ("BUILD_SIGNATURE_POLICY_PATH", "/etc/containers/policy.json"),
        ("BUILD_ISOLATION", "chroot"),
    ]));
    let EngineMode::Embedded(options) = env.engine else {
        panic!("expected embedded mode");
    };
    assert_eq!(options.storage_driver.as_deref(), Some("vfs"));
    assert_eq!(
        options.storage_conf,
        Some(PathBuf::from("/etc/containers/storage.conf"))
    );
    assert_eq!(
        options.registries_conf,
        Some(PathBuf::from("/etc/containers/registries.conf"))
    );
    assert_eq!(options.registries_dir, None);
    assert_eq!(
        options.signature_policy,
        Some(PathBuf::from("/etc/containers/policy.json"))
    );
    assert_eq!(options.isolation.as_deref(), Some("chroot"));
}

#[test]
fn build_and_secret_path_are_read() {
    let env = WorkerEnv::from_vars(vars(&[
        ("BUILD", "{\"kind\":\"Build\"}"),
        ("SOURCE_SECRET_PATH", "/var/run/secrets/source"),
        ("BUILD_ON_PANIC", "crash"),
    ]));
    assert_eq!(env.build, "{\"kind\":\"Build\"}");
    assert_eq!(
        env.source_secret_path,
        Some(PathBuf::from("/var/run/secrets/source"))
    );
    assert!(env.crash_on_panic);
}

#[yare::parameterized(
    numeric   = { "5", Some(5) },
    padded    = { " 2 ", Some(2) },
    empty     = { "", None },
    garbage   = { "loud", None },
)]
fn log_level_parsing(value: &str, expected: Option<u8>) {
    let env = WorkerEnv::from_vars(vars(&[("BUILD_LOGLEVEL", value)]));
    assert_eq!(env.log_level.map(Verbosity::level), expected);
}

#[yare::parameterized(
    quiet   = { 0, "info" },
    normal  = { 2, "info" },
    debug   = { 4, "debug" },
    trace   = { 5, "trace" },
    maximum = { 10, "trace" },
)]
fn verbosity_filter_directive(level: u8, expected: &str) {
    assert_eq!(Verbosity::new(level).filter_directive(), expected);
}

#[test]
fn verbosity_gates_by_level() {
    let v = Verbosity::new(4);
    assert!(v.is(0));
    assert!(v.is(4));
    assert!(!v.is(5));
}
