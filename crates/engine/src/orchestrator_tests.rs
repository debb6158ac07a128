// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::env::Verbosity;
use bw_adapters::{
    DaemonEndpoint, EngineClient, FakeExtractor, FakeGit, FakeStatusReporter, FakeStrategy,
    GitCall,
};
use bw_core::{
    test_support, BuildPhase, GitSourceRevision, ImageSource, ImageSourcePath, Limit,
    ObjectReference,
};
use std::cell::RefCell;
use tempfile::TempDir;

const RECORD: &str = "\
11:memory:/kubepods/burstable/pod77/crio-9d1e0b.scope
10:cpu,cpuacct:/kubepods/burstable/pod77/crio-9d1e0b.scope
9:net_cls,net_prio:/kubepods/burstable/pod77/crio-9d1e0b.scope
";

/// Temp layout holding the input dir and a cgroup v1 hierarchy.
struct Harness {
    tmp: TempDir,
    reporter: FakeStatusReporter,
}

impl Harness {
    fn new() -> Self {
        Self::with_reporter(FakeStatusReporter::new())
    }

    fn with_reporter(reporter: FakeStatusReporter) -> Self {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("cgroup"), RECORD).unwrap();
        Self { tmp, reporter }
    }

    fn inputs(&self) -> PathBuf {
        self.tmp.path().join("inputs")
    }

    fn limit_memory(&self, bytes: &str) {
        let dir = self.tmp.path().join("fs/memory");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("memory.limit_in_bytes"), bytes).unwrap();
    }

    fn orchestrator(&self, build: Build) -> Orchestrator<FakeStatusReporter> {
        self.orchestrator_with(build, None, None)
    }

    fn orchestrator_with(
        &self,
        build: Build,
        client: Option<EngineClient>,
        secret_dir: Option<PathBuf>,
    ) -> Orchestrator<FakeStatusReporter> {
        let session = SessionConfig {
            build,
            source_secret_dir: secret_dir,
            client,
            reporter: self.reporter.clone(),
            verbosity: Verbosity::default(),
        };
        Orchestrator::new(session)
            .with_input_dir(self.inputs())
            .with_cgroup_paths(CgroupPaths {
                self_cgroup: self.tmp.path().join("cgroup"),
                root: self.tmp.path().join("fs"),
            })
            .with_process_env(vec!["PATH=/usr/bin".to_string()])
    }

    fn only_report(&self) -> Build {
        let reports = self.reporter.reports();
        assert_eq!(reports.len(), 1, "expected exactly one status report");
        reports.into_iter().next().unwrap()
    }
}

fn daemon_client() -> EngineClient {
    EngineClient::Daemon(DaemonEndpoint::parse("unix:///nonexistent/docker.sock").unwrap())
}

fn stage_names(build: &Build) -> Vec<String> {
    build.status.stages.iter().map(|s| s.name.clone()).collect()
}

// ── clone_source ────────────────────────────────────────────────────────────

#[tokio::test]
async fn clone_reports_revision_and_fetch_stage() {
    let h = Harness::new();
    let mut build = test_support::git_build("app", "https://example.com/app.git");
    build.metadata.resource_version = Some("41".to_string());
    let git = FakeGit::new().with_source_info(GitSourceRevision {
        commit: "c0ffee".to_string(),
        ..Default::default()
    });
    let mut orch = h.orchestrator(build);

    orch.clone_source(|_| git.clone(), &mut std::io::empty()).await.unwrap();

    let report = h.only_report();
    assert_eq!(stage_names(&report), vec!["FetchInputs"]);
    assert_eq!(report.status.stages[0].steps[0].name, "FetchGitSource");
    assert_eq!(report.source_commit(), Some("c0ffee"));
    assert_eq!(report.metadata.resource_version, None);
    assert!(!report.status.is_failed());
    assert!(matches!(
        &git.calls()[0],
        GitCall::Clone { dir, opts, .. } if *dir == h.inputs() && opts.shallow
    ));
}

#[tokio::test]
async fn clone_passes_merged_git_environment() {
    let h = Harness::new();
    let mut build = test_support::git_build("app", "https://example.com/app.git");
    if let Some(git) = build.spec.source.git.as_mut() {
        git.https_proxy = Some("http://proxy:3128".to_string());
    }
    let seen = RefCell::new(Vec::new());
    let mut orch = h.orchestrator(build);

    orch.clone_source(
        |env| {
            *seen.borrow_mut() = env.to_vec();
            FakeGit::new()
        },
        &mut std::io::empty(),
    )
    .await
    .unwrap();

    let env = seen.into_inner();
    assert!(env.contains(&"PATH=/usr/bin".to_string()));
    assert!(env.contains(&"GIT_ASKPASS=true".to_string()));
    assert!(env.contains(&"HTTPS_PROXY=http://proxy:3128".to_string()));
    assert!(env.contains(&"https_proxy=http://proxy:3128".to_string()));
}

#[tokio::test]
async fn clone_failure_marks_fetch_source_failed() {
    let h = Harness::new();
    let build = test_support::git_build("app", "https://example.com/app.git");
    let mut orch = h.orchestrator(build);

    let err = orch
        .clone_source(|_| FakeGit::new().failing_clone("repository not found"), &mut std::io::empty())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::Source(SourceError::Git(_))));
    let report = h.only_report();
    assert_eq!(report.status.phase, BuildPhase::Failed);
    assert_eq!(report.status.reason, Some(StatusReason::FetchSourceFailed));
    assert!(report.status.stages.is_empty());
    assert!(report.spec.revision.is_none());
}

#[tokio::test]
async fn missing_context_dir_is_reported_as_invalid() {
    let h = Harness::new();
    let mut build = test_support::git_build("app", "https://example.com/app.git");
    build.spec.source.context_dir = "web".to_string();
    let mut orch = h.orchestrator(build);

    let err = orch
        .clone_source(|_| FakeGit::new().with_files(&["api/main.go"]), &mut std::io::empty())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "provided context directory does not exist: web");
    let report = h.only_report();
    assert_eq!(report.status.reason, Some(StatusReason::InvalidContextDirectory));
    assert_eq!(stage_names(&report), vec!["FetchInputs"]);
}

#[tokio::test]
async fn present_context_dir_passes() {
    let h = Harness::new();
    let mut build = test_support::git_build("app", "https://example.com/app.git");
    build.spec.source.context_dir = "web".to_string();
    let mut orch = h.orchestrator(build);

    orch.clone_source(|_| FakeGit::new().with_files(&["web/Dockerfile"]), &mut std::io::empty())
        .await
        .unwrap();

    assert!(!h.only_report().status.is_failed());
}

#[tokio::test]
async fn absolute_context_dir_is_resolved_inside_inputs() {
    let h = Harness::new();
    let mut build = test_support::git_build("app", "https://example.com/app.git");
    build.spec.source.context_dir = "/tmp".to_string();
    let mut orch = h.orchestrator(build);

    let err = orch
        .clone_source(|_| FakeGit::new().with_files(&["web/Dockerfile"]), &mut std::io::empty())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkerError::Source(SourceError::MissingContextDir(_))));
    assert_eq!(h.only_report().status.reason, Some(StatusReason::InvalidContextDirectory));
}

#[tokio::test]
async fn panic_while_fetching_still_reports_once() {
    let h = Harness::new();
    let build = test_support::git_build("app", "https://example.com/app.git");
    let mut orch = h.orchestrator(build);

    let err = orch
        .clone_source(
            |_| -> FakeGit { panic!("git client exploded") },
            &mut std::io::empty(),
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, WorkerError::Panicked(message) if message == "git client exploded"));
    let report = h.only_report();
    assert_eq!(report.status.phase, BuildPhase::Failed);
    assert_eq!(report.status.reason, Some(StatusReason::FetchSourceFailed));
}

#[tokio::test]
async fn secret_material_is_removed_after_clone() {
    let h = Harness::new();
    let secret = TempDir::new().unwrap();
    std::fs::write(secret.path().join("username"), "builder").unwrap();
    std::fs::write(secret.path().join("password"), "hunter2").unwrap();
    let build = test_support::git_build_with_secret("app", "https://example.com/app.git", "creds");
    let seen = RefCell::new(Vec::new());
    let mut orch = h.orchestrator_with(build, None, Some(secret.path().to_path_buf()));

    orch.clone_source(
        |env| {
            *seen.borrow_mut() = env.to_vec();
            FakeGit::new()
        },
        &mut std::io::empty(),
    )
    .await
    .unwrap();

    let env = seen.into_inner();
    let config = env
        .iter()
        .find_map(|e| e.strip_prefix("GIT_CONFIG_GLOBAL="))
        .map(PathBuf::from)
        .unwrap();
    assert!(!config.exists(), "{} outlived the clone", config.display());
    assert_eq!(h.only_report().status.reason, None);
}

#[tokio::test]
async fn secret_without_mount_fails_before_cloning() {
    let h = Harness::new();
    let build = test_support::git_build_with_secret("app", "https://example.com/app.git", "creds");
    let git = FakeGit::new();
    let mut orch = h.orchestrator(build);

    let err = orch.clone_source(|_| git.clone(), &mut std::io::empty()).await.unwrap_err();

    assert!(matches!(err, WorkerError::Source(SourceError::SecretDirMissing(_))));
    assert!(git.calls().is_empty());
    assert_eq!(h.only_report().status.reason, Some(StatusReason::FetchSourceFailed));
}

#[tokio::test]
async fn binary_payload_is_stored_without_git() {
    let h = Harness::new();
    let build = test_support::binary_build("app", "app.war");
    let mut orch = h.orchestrator(build);
    let mut payload: &[u8] = b"PK\x03\x04";

    orch.clone_source(
        |_| -> FakeGit { panic!("no git source to clone") },
        &mut payload,
    )
    .await
    .unwrap();

    assert_eq!(std::fs::read(h.inputs().join("app.war")).unwrap(), b"PK\x03\x04");
    let report = h.only_report();
    assert_eq!(report.status.stages[0].steps[0].name, "ExtractBinarySource");
}

// ── execute ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn execute_passes_discovered_limits_to_strategy() {
    let h = Harness::new();
    h.limit_memory("536870912\n");
    let strategy = FakeStrategy::new();
    let build = test_support::docker_build("app", Some("registry/app:latest"));
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let outcome = orch.execute(&strategy).await.unwrap();

    assert_eq!(outcome, ExecuteOutcome::Pushed);
    let calls = strategy.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].limits.memory_limit_bytes, Limit::Value(536_870_912));
    assert_eq!(calls[0].limits.memory_swap, Limit::Value(536_870_912));
    assert_eq!(calls[0].limits.parent.as_deref(), Some("pod77"));
    assert_eq!(calls[0].input_dir, h.inputs());
    assert!(!h.only_report().status.is_failed());
}

#[tokio::test]
async fn execute_without_output_requests_no_push() {
    let h = Harness::new();
    h.limit_memory("9223372036854771712\n");
    let build = test_support::docker_build("app", None);
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let outcome = orch.execute(&FakeStrategy::new()).await.unwrap();

    assert_eq!(outcome, ExecuteOutcome::NoPushRequested);
    assert_eq!(h.reporter.reports().len(), 1);
}

#[tokio::test]
async fn unreadable_limits_abort_before_strategy() {
    let h = Harness::new();
    let strategy = FakeStrategy::new();
    let build = test_support::docker_build("app", None);
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let err = orch.execute(&strategy).await.unwrap_err();

    assert!(err.to_string().starts_with("failed to retrieve cgroup limits:"), "got: {err}");
    assert!(strategy.calls().is_empty());
    assert_eq!(h.only_report().status.reason, Some(StatusReason::GenericBuildFailed));
}

#[tokio::test]
async fn record_without_memory_controller_aborts_before_strategy() {
    let h = Harness::new();
    h.limit_memory("1073741824\n");
    std::fs::write(
        h.tmp.path().join("cgroup"),
        "10:cpu,cpuacct:/kubepods/burstable/pod77/crio-9d1e0b.scope\n\
         9:net_cls,net_prio:/kubepods/burstable/pod77/crio-9d1e0b.scope\n",
    )
    .unwrap();
    let strategy = FakeStrategy::new();
    let build = test_support::docker_build("app", None);
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let err = orch.execute(&strategy).await.unwrap_err();

    assert!(
        matches!(err, WorkerError::Limits(cgroup::CgroupError::MissingMemoryController(_))),
        "got: {err}"
    );
    assert!(strategy.calls().is_empty());
    assert_eq!(h.only_report().status.reason, Some(StatusReason::GenericBuildFailed));
}

#[tokio::test]
async fn strategy_panic_still_reports_once() {
    let h = Harness::new();
    h.limit_memory("1073741824\n");
    let strategy = FakeStrategy::new().panicking("engine went away");
    let build = test_support::docker_build("app", Some("registry/app:latest"));
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let err = orch.execute(&strategy).await.unwrap_err();

    assert_eq!(err.to_string(), "worker panicked: engine went away");
    assert_eq!(strategy.calls().len(), 1);
    let report = h.only_report();
    assert_eq!(report.status.reason, Some(StatusReason::GenericBuildFailed));
}

#[tokio::test]
async fn oversized_stage_from_descriptor_does_not_block_report() {
    let h = Harness::new();
    let mut build = test_support::git_build("app", "https://example.com/app.git");
    build.status.stages = vec![bw_core::StageInfo {
        name: "FetchInputs".to_string(),
        start_time: chrono::Utc::now(),
        duration_milliseconds: i64::MAX,
        steps: Vec::new(),
    }];
    let mut orch = h.orchestrator(build);

    orch.clone_source(|_| FakeGit::new(), &mut std::io::empty()).await.unwrap();

    let report = h.only_report();
    assert_eq!(stage_names(&report), vec!["FetchInputs"]);
    assert_eq!(report.status.stages[0].steps[0].name, "FetchGitSource");
}

#[tokio::test]
async fn strategy_failure_keeps_its_own_reason() {
    let h = Harness::new();
    h.limit_memory("1073741824\n");
    let strategy = FakeStrategy::new()
        .failing("push denied")
        .with_reason(StatusReason::PushImageToRegistryFailed);
    let build = test_support::docker_build("app", Some("registry/app:latest"));
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let err = orch.execute(&strategy).await.unwrap_err();

    assert_eq!(err.to_string(), "build error: push denied");
    assert_eq!(
        h.only_report().status.reason,
        Some(StatusReason::PushImageToRegistryFailed)
    );
}

#[tokio::test]
async fn strategy_failure_without_reason_is_generic() {
    let h = Harness::new();
    h.limit_memory("1073741824\n");
    let build = test_support::docker_build("app", None);
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    orch.execute(&FakeStrategy::new().failing("boom")).await.unwrap_err();

    assert_eq!(h.only_report().status.reason, Some(StatusReason::GenericBuildFailed));
}

#[tokio::test]
async fn execute_without_engine_fails() {
    let h = Harness::new();
    h.limit_memory("1073741824\n");
    let strategy = FakeStrategy::new();
    let mut orch = h.orchestrator(test_support::docker_build("app", None));

    let err = orch.execute(&strategy).await.unwrap_err();

    assert!(matches!(err, WorkerError::NoEngine));
    assert!(strategy.calls().is_empty());
    assert_eq!(h.reporter.reports().len(), 1);
}

#[tokio::test]
async fn report_failure_does_not_change_outcome() {
    let h = Harness::with_reporter(FakeStatusReporter::new().failing("connection refused"));
    h.limit_memory("1073741824\n");
    let build = test_support::docker_build("app", None);
    let mut orch = h.orchestrator_with(build, Some(daemon_client()), None);

    let outcome = orch.execute(&FakeStrategy::new()).await.unwrap();

    assert_eq!(outcome, ExecuteOutcome::NoPushRequested);
    assert_eq!(h.reporter.reports().len(), 1);
}

// ── manage_dockerfile ───────────────────────────────────────────────────────

#[tokio::test]
async fn manage_dockerfile_rewrites_and_reports_once() {
    let h = Harness::new();
    std::fs::create_dir_all(h.inputs()).unwrap();
    std::fs::write(h.inputs().join("Dockerfile"), "FROM centos\nRUN true\n").unwrap();
    let mut orch = h.orchestrator(test_support::docker_build("app", None));

    orch.manage_dockerfile().await.unwrap();

    let written = std::fs::read_to_string(h.inputs().join("Dockerfile")).unwrap();
    assert!(written.contains("ENV \"APP_ENV\"=\"test\""), "got: {written}");
    assert!(!h.only_report().status.is_failed());
}

#[tokio::test]
async fn manage_dockerfile_write_failure_is_generic() {
    let h = Harness::new();
    let mut build = test_support::docker_build("app", None);
    build.spec.source.dockerfile = Some("FROM scratch\n".to_string());
    // The input dir is a plain file, so nothing can be written beneath it
    std::fs::write(h.inputs(), "").unwrap();
    let mut orch = h.orchestrator(build);

    let err = orch.manage_dockerfile().await.unwrap_err();

    assert!(matches!(err, WorkerError::Dockerfile(_)));
    assert_eq!(h.only_report().status.reason, Some(StatusReason::GenericBuildFailed));
}

// ── extract_image_content ───────────────────────────────────────────────────

fn image_build(images: &[&str]) -> Build {
    let mut build = test_support::docker_build("app", None);
    build.spec.source.images = images
        .iter()
        .map(|name| ImageSource {
            from: ObjectReference {
                kind: "DockerImage".to_string(),
                name: name.to_string(),
                namespace: None,
            },
            paths: vec![ImageSourcePath {
                source_path: "/opt/app/lib.jar".to_string(),
                destination_dir: "libs".to_string(),
            }],
        })
        .collect();
    build
}

#[tokio::test]
async fn image_content_is_extracted_into_inputs() {
    let h = Harness::new();
    let extractor = FakeExtractor::new();
    let mut orch = h.orchestrator(image_build(&["registry/base:1", "registry/tools:2"]));

    orch.extract_image_content_with(&extractor).await.unwrap();

    let calls = extractor.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].image, "registry/tools:2");
    assert_eq!(calls[0].destination, h.inputs().join("libs"));
    assert!(h.inputs().join("libs/lib.jar").exists());
    let report = h.only_report();
    assert_eq!(report.status.stages[0].steps[0].name, "FetchImageContent");
}

#[tokio::test]
async fn image_content_failure_stops_extraction() {
    let h = Harness::new();
    let extractor = FakeExtractor::new().failing_for("registry/base:1");
    let mut orch = h.orchestrator(image_build(&["registry/base:1", "registry/tools:2"]));

    let err = orch.extract_image_content_with(&extractor).await.unwrap_err();

    assert!(err.to_string().starts_with("failed to extract image content:"), "got: {err}");
    assert_eq!(extractor.calls().len(), 1);
    assert_eq!(h.only_report().status.reason, Some(StatusReason::FetchImageContentFailed));
}

#[tokio::test]
async fn no_images_still_reports_once() {
    let h = Harness::new();
    let extractor = FakeExtractor::new();
    let mut orch = h.orchestrator(image_build(&[]));

    orch.extract_image_content_with(&extractor).await.unwrap();

    assert!(extractor.calls().is_empty());
    assert!(h.only_report().status.stages.is_empty());
}

#[tokio::test]
async fn extract_without_engine_fails() {
    let h = Harness::new();
    let mut orch = h.orchestrator(image_build(&["registry/base:1"]));

    let err = orch.extract_image_content().await.unwrap_err();

    assert!(matches!(err, WorkerError::NoEngine));
    assert_eq!(h.only_report().status.reason, Some(StatusReason::FetchImageContentFailed));
}
