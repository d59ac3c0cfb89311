//! End-to-end orchestration tests with in-memory fakes for the pipeline
//! runner and the status reporter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::json;

use relay_ci_server::models::build::{BuildRecord, StageResult};
use relay_ci_server::models::push_event::PushEvent;
use relay_ci_server::routes::webhook::handle_webhook;
use relay_ci_server::routes::CiRouterState;
use relay_ci_server::services::github_service::{CommitState, StatusReporter};
use relay_ci_server::services::orchestrator::Orchestrator;
use relay_ci_server::services::runner::{PipelineOutcome, PipelineRunner};
use relay_ci_server::store::{BuildStore, HistoryStore, StoreError};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Scripted pipeline runner.
enum FakeRunner {
    /// Every stage passes.
    Succeed,
    /// Install and compile pass, tests fail.
    FailTests,
    /// The runner invocation itself errors out.
    Error,
}

#[async_trait]
impl PipelineRunner for FakeRunner {
    async fn run(
        &self,
        _branch: &str,
        commit: &str,
        _local: bool,
    ) -> anyhow::Result<PipelineOutcome> {
        match self {
            FakeRunner::Succeed => Ok(PipelineOutcome {
                install: StageResult::ok("install ok"),
                compile: StageResult::ok("compile ok"),
                test: StageResult::ok("test ok"),
            }),
            FakeRunner::FailTests => Ok(PipelineOutcome {
                install: StageResult::ok("install ok"),
                compile: StageResult::ok("compile ok"),
                test: StageResult::failed("2 tests failed"),
            }),
            FakeRunner::Error => anyhow::bail!("cannot spawn pipeline for {commit}"),
        }
    }
}

/// Status reporter that records every call instead of talking to GitHub.
#[derive(Default)]
struct RecordingReporter {
    calls: Mutex<Vec<(String, CommitState, String)>>,
}

impl RecordingReporter {
    fn calls(&self) -> Vec<(String, CommitState, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusReporter for RecordingReporter {
    async fn report(
        &self,
        event: &PushEvent,
        state: CommitState,
        description: &str,
    ) -> anyhow::Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((event.commit_hash.clone(), state, description.to_string()));
        Ok(())
    }
}

/// Status reporter whose calls always fail, for error-containment tests.
struct BrokenReporter;

#[async_trait]
impl StatusReporter for BrokenReporter {
    async fn report(
        &self,
        _event: &PushEvent,
        _state: CommitState,
        _description: &str,
    ) -> anyhow::Result<()> {
        anyhow::bail!("status API unreachable")
    }
}

/// History store whose first `rejections` inserts fail with `DuplicateId`,
/// as if another writer had raced the same id into the history.
struct CollidingStore {
    inner: Arc<BuildStore>,
    rejections: Mutex<u32>,
}

impl CollidingStore {
    fn new(inner: Arc<BuildStore>, rejections: u32) -> Self {
        Self {
            inner,
            rejections: Mutex::new(rejections),
        }
    }
}

#[async_trait]
impl HistoryStore for CollidingStore {
    async fn next_id(&self) -> u64 {
        self.inner.next_id().await
    }

    async fn insert(&self, record: BuildRecord) -> Result<(), StoreError> {
        {
            let mut rejections = self.rejections.lock().unwrap();
            if *rejections > 0 {
                *rejections -= 1;
                return Err(StoreError::DuplicateId(record.id));
            }
        }
        self.inner.insert(record).await
    }

    async fn find(&self, id: u64) -> Option<BuildRecord> {
        self.inner.find(id).await
    }

    async fn all(&self) -> Vec<BuildRecord> {
        self.inner.all().await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn event(commit: &str) -> PushEvent {
    PushEvent {
        branch: "main".to_string(),
        commit_hash: commit.to_string(),
        after_sha: format!("{commit}{}", "0".repeat(40 - commit.len())),
        owner: "relay-ci".to_string(),
        repo: "relay".to_string(),
    }
}

async fn store(dir: &tempfile::TempDir) -> Arc<BuildStore> {
    Arc::new(
        BuildStore::load(dir.path().join("history.json"))
            .await
            .unwrap(),
    )
}

fn orchestrator(
    store: Arc<BuildStore>,
    runner: FakeRunner,
    reporter: Arc<dyn StatusReporter>,
) -> Arc<Orchestrator> {
    Arc::new(Orchestrator::new(store, Arc::new(runner), reporter, false))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn successful_build_is_persisted_and_reported() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let reporter = Arc::new(RecordingReporter::default());

    orchestrator(store.clone(), FakeRunner::Succeed, reporter.clone())
        .handle_event(event("abc1234"))
        .await;

    let record = store.find(1).await.unwrap();
    assert_eq!(record.commit_hash, "abc1234");
    assert_eq!(record.branch, "main");
    assert!(record.overall_success());
    assert_eq!(store.next_id().await, 2);

    // Pending first, then exactly one terminal state.
    let calls = reporter.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, CommitState::Pending);
    assert_eq!(calls[1].1, CommitState::Success);
    assert_eq!(calls[1].2, "All tests passed");
}

#[tokio::test]
async fn failed_tests_report_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let reporter = Arc::new(RecordingReporter::default());

    orchestrator(store.clone(), FakeRunner::FailTests, reporter.clone())
        .handle_event(event("bbb0002"))
        .await;

    let record = store.find(1).await.unwrap();
    assert!(record.install.succeeded);
    assert!(!record.test.succeeded);
    assert!(!record.overall_success());

    let calls = reporter.calls();
    assert_eq!(calls[1].1, CommitState::Failure);
    assert_eq!(calls[1].2, "Build failed");
}

#[tokio::test]
async fn runner_error_records_a_failed_build() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let reporter = Arc::new(RecordingReporter::default());

    orchestrator(store.clone(), FakeRunner::Error, reporter.clone())
        .handle_event(event("dead000"))
        .await;

    // The event is never dropped: a failed record is synthesized and persisted.
    let record = store.find(1).await.unwrap();
    assert!(!record.test.succeeded);
    assert!(record.test.logs.contains("pipeline runner error"));

    let calls = reporter.calls();
    assert_eq!(calls.last().unwrap().1, CommitState::Failure);
}

#[tokio::test]
async fn unreachable_status_api_does_not_block_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;

    orchestrator(store.clone(), FakeRunner::Succeed, Arc::new(BrokenReporter))
        .handle_event(event("abc1234"))
        .await;

    assert!(store.find(1).await.unwrap().overall_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_events_get_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let reporter = Arc::new(RecordingReporter::default());

    let a = orchestrator(store.clone(), FakeRunner::Succeed, reporter.clone());
    let b = orchestrator(store.clone(), FakeRunner::Succeed, reporter.clone());
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.handle_event(event("aaa0001")).await }),
        tokio::spawn(async move { b.handle_event(event("bbb0002")).await }),
    );
    ra.unwrap();
    rb.unwrap();

    let all = store.all().await;
    assert_eq!(all.len(), 2);
    assert_ne!(all[0].id, all[1].id);
    for record in &all {
        assert_eq!(store.find(record.id).await.as_ref(), Some(record));
    }
}

#[tokio::test]
async fn id_collision_is_retried_with_a_fresh_id() {
    let dir = tempfile::tempdir().unwrap();
    let inner = store(&dir).await;
    let colliding = Arc::new(CollidingStore::new(inner.clone(), 1));
    let reporter = Arc::new(RecordingReporter::default());

    Orchestrator::new(
        colliding,
        Arc::new(FakeRunner::Succeed),
        reporter.clone(),
        false,
    )
    .handle_event(event("abc1234"))
    .await;

    // Id 1 collided; the single re-allocation landed the record on id 2.
    let all = inner.all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, 2);
    assert_eq!(reporter.calls().last().unwrap().1, CommitState::Success);
}

#[tokio::test]
async fn exhausted_retry_leaves_build_unrecorded_but_reported() {
    let dir = tempfile::tempdir().unwrap();
    let inner = store(&dir).await;
    let colliding = Arc::new(CollidingStore::new(inner.clone(), 2));
    let reporter = Arc::new(RecordingReporter::default());

    Orchestrator::new(
        colliding,
        Arc::new(FakeRunner::Succeed),
        reporter.clone(),
        false,
    )
    .handle_event(event("abc1234"))
    .await;

    // One retry only: the build is given up as unrecorded, not looped on,
    // and the terminal status still reflects the pipeline outcome.
    assert!(inner.all().await.is_empty());
    let calls = reporter.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, CommitState::Pending);
    assert_eq!(calls[1].1, CommitState::Success);
}

#[tokio::test]
async fn branch_deletion_produces_no_record_and_no_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let reporter = Arc::new(RecordingReporter::default());
    let state = CiRouterState {
        store: store.clone(),
        orchestrator: orchestrator(store.clone(), FakeRunner::Succeed, reporter.clone()),
    };

    let payload = json!({
        "ref": "refs/heads/gone",
        "after": "0000000000000000000000000000000000000000",
        "repository": { "name": "relay", "owner": { "name": "relay-ci" } },
    });
    let mut headers = HeaderMap::new();
    headers.insert("x-github-event", HeaderValue::from_static("push"));

    let status = handle_webhook(&state, &headers, Bytes::from(payload.to_string()))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(store.all().await.is_empty());
    assert!(reporter.calls().is_empty());
}

#[tokio::test]
async fn ping_is_acknowledged_without_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir).await;
    let reporter = Arc::new(RecordingReporter::default());
    let state = CiRouterState {
        store: store.clone(),
        orchestrator: orchestrator(store.clone(), FakeRunner::Succeed, reporter.clone()),
    };

    let mut headers = HeaderMap::new();
    headers.insert("x-github-event", HeaderValue::from_static("ping"));

    let status = handle_webhook(&state, &headers, Bytes::from_static(b"{\"zen\":\"ok\"}"))
        .await
        .unwrap();

    assert_eq!(status, StatusCode::OK);
    assert!(store.all().await.is_empty());
    assert!(reporter.calls().is_empty());
}
