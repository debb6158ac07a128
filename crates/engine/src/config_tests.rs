// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bw_adapters::FakeStatusReporter;
use bw_core::test_support;
use std::cell::RefCell;
use tempfile::TempDir;

fn worker_env(build: &Build, engine: EngineMode) -> WorkerEnv {
    WorkerEnv {
        build: build.to_json().unwrap(),
        source_secret_path: Some(PathBuf::from("/var/run/secrets/source")),
        engine,
        log_level: None,
        crash_on_panic: false,
    }
}

fn daemon(endpoint: &str) -> EngineMode {
    EngineMode::Daemon {
        endpoint: endpoint.to_string(),
    }
}

fn load(
    env: &WorkerEnv,
    needs_engine: bool,
) -> Result<SessionConfig<FakeStatusReporter>, ConfigError> {
    SessionConfig::load_with(env, needs_engine, Verbosity::new(5), |_| {
        Ok(FakeStatusReporter::new())
    })
}

/// Storage configuration rooting the embedded store under `dir`.
fn storage_conf(dir: &Path) -> PathBuf {
    let conf = dir.join("storage.conf");
    std::fs::write(
        &conf,
        format!(
            "[storage]\ndriver = \"vfs\"\ngraphroot = \"{}\"\nrunroot = \"{}\"\n",
            dir.join("graph").display(),
            dir.join("run").display()
        ),
    )
    .unwrap();
    conf
}

#[test]
fn load_decodes_descriptor_without_engine() {
    let build = test_support::git_build("app", "https://example.com/app.git");
    let namespaces = RefCell::new(Vec::new());

    let config = SessionConfig::load_with(
        &worker_env(&build, daemon("not a url")),
        false,
        Verbosity::default(),
        |ns| {
            namespaces.borrow_mut().push(ns.to_string());
            Ok(FakeStatusReporter::new())
        },
    )
    .unwrap();

    assert_eq!(config.build, build);
    assert!(config.client.is_none());
    assert_eq!(
        config.source_secret_dir,
        Some(PathBuf::from("/var/run/secrets/source"))
    );
    assert_eq!(namespaces.into_inner(), vec!["test-ns".to_string()]);
}

#[test]
fn load_rejects_undecodable_descriptor() {
    let mut env = worker_env(&test_support::empty_build("a", "ns"), daemon("unix:///d.sock"));
    env.build = "{not json".to_string();

    let err = load(&env, false).err().unwrap();
    assert!(matches!(err, ConfigError::Descriptor(DescriptorError::Decode(_))));
    assert!(err.to_string().starts_with("unable to parse build string"));
}

#[test]
fn load_rejects_other_kinds() {
    let mut env = worker_env(&test_support::empty_build("a", "ns"), daemon("unix:///d.sock"));
    env.build = r#"{"kind":"Pod","metadata":{"name":"a"}}"#.to_string();

    let err = load(&env, false).err().unwrap();
    assert!(matches!(err, ConfigError::Descriptor(DescriptorError::NotABuild(kind)) if kind == "Pod"));
}

#[test]
fn load_validates_daemon_endpoint() {
    let build = test_support::docker_build("app", None);

    let config = load(&worker_env(&build, daemon("unix:///var/run/docker.sock")), true).unwrap();
    assert!(matches!(config.client, Some(EngineClient::Daemon(ref ep)) if ep.as_str() == "unix:///var/run/docker.sock"));

    let err = load(&worker_env(&build, daemon("ftp://host")), true).err().unwrap();
    assert!(matches!(err, ConfigError::Daemon(EngineError::InvalidEndpoint { .. })));
}

#[test]
fn load_reports_cluster_connection_failure() {
    let build = test_support::empty_build("app", "ns");
    let result: Result<SessionConfig<FakeStatusReporter>, _> = SessionConfig::load_with(
        &worker_env(&build, daemon("unix:///d.sock")),
        false,
        Verbosity::default(),
        |_| Err(ReportError::NotInCluster("KUBERNETES_SERVICE_HOST")),
    );

    let err = result.err().unwrap();
    assert!(matches!(err, ConfigError::Cluster(_)));
    assert!(err.to_string().starts_with("cannot connect to the server"));
}

#[test]
fn embedded_store_is_opened_and_closed() {
    let tmp = TempDir::new().unwrap();
    let options = EmbeddedOptions {
        storage_conf: Some(storage_conf(tmp.path())),
        ..Default::default()
    };
    let build = test_support::docker_build("app", None);

    let mut config = load(&worker_env(&build, EngineMode::Embedded(options)), true).unwrap();

    let Some(EngineClient::Embedded(store)) = &config.client else {
        panic!("expected embedded client");
    };
    assert!(store.is_open());
    assert_eq!(store.options().graph_root, tmp.path().join("graph"));

    config.close();
    config.close();
    let Some(EngineClient::Embedded(store)) = &config.client else {
        panic!("expected embedded client");
    };
    assert!(!store.is_open());
}

#[test]
fn storage_conf_overrides_driver_override() {
    let tmp = TempDir::new().unwrap();
    let options = EmbeddedOptions {
        storage_driver: Some("overlay2".to_string()),
        storage_conf: Some(storage_conf(tmp.path())),
        ..Default::default()
    };

    let store = store_options(&options).unwrap();
    assert_eq!(store.driver, "vfs");
}

#[test]
fn driver_override_applies_without_storage_conf() {
    let options = EmbeddedOptions {
        storage_driver: Some("vfs".to_string()),
        storage_conf: Some(PathBuf::from("/nonexistent/storage.conf")),
        isolation: Some("chroot".to_string()),
        ..Default::default()
    };

    let store = store_options(&options).unwrap();
    assert_eq!(store.driver, "vfs");
    assert_eq!(store.graph_root, StoreOptions::default().graph_root);
    assert_eq!(store.isolation.as_deref(), Some("chroot"));
}

#[test]
fn path_overrides_apply_only_when_present() {
    let tmp = TempDir::new().unwrap();
    let registries = tmp.path().join("registries.conf");
    std::fs::write(&registries, "").unwrap();
    let options = EmbeddedOptions {
        registries_conf: Some(registries.clone()),
        registries_dir: Some(tmp.path().join("absent.d")),
        signature_policy: Some(tmp.path().to_path_buf()),
        ..Default::default()
    };

    let store = store_options(&options).unwrap();
    assert_eq!(store.registries_conf, Some(registries));
    assert_eq!(store.registries_dir, None);
    assert_eq!(store.signature_policy, Some(tmp.path().to_path_buf()));
}

#[test]
fn unreadable_storage_conf_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let conf = tmp.path().join("storage.conf");
    std::fs::write(&conf, "[storage\n").unwrap();
    let options = EmbeddedOptions {
        storage_conf: Some(conf),
        ..Default::default()
    };

    assert!(matches!(store_options(&options), Err(ConfigError::Store(_))));
}
