//! Build orchestrator — runs one validated push event end to end.
//!
//! Per-event sequence: report pending, run the pipeline, allocate an id,
//! persist the record, report the terminal state. Both status reports are
//! best-effort; persistence failures degrade that one build's history,
//! never the process.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::models::build::{BuildRecord, CREATED_AT_FORMAT};
use crate::models::push_event::PushEvent;
use crate::services::github_service::{report_best_effort, CommitState, StatusReporter};
use crate::services::runner::{PipelineOutcome, PipelineRunner};
use crate::store::{HistoryStore, StoreError};

pub struct Orchestrator {
    store: Arc<dyn HistoryStore>,
    runner: Arc<dyn PipelineRunner>,
    reporter: Arc<dyn StatusReporter>,
    /// Local/offline execution mode, recorded on every build for provenance.
    local: bool,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        runner: Arc<dyn PipelineRunner>,
        reporter: Arc<dyn StatusReporter>,
        local: bool,
    ) -> Self {
        Self {
            store,
            runner,
            reporter,
            local,
        }
    }

    /// Handle one validated push event. Invoked as an independent task per
    /// event; never returns an error — every failure mode is contained here.
    pub async fn handle_event(&self, event: PushEvent) {
        let start = Instant::now();
        tracing::info!(
            commit = %event.commit_hash,
            branch = %event.branch,
            "Build started"
        );

        report_best_effort(
            self.reporter.as_ref(),
            &event,
            CommitState::Pending,
            "Build started",
        )
        .await;

        let outcome = match self.runner.run(&event.branch, &event.commit_hash, self.local).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    commit = %event.commit_hash,
                    "Pipeline runner failed, recording build as failed: {e}"
                );
                PipelineOutcome::runner_failure(&format!("pipeline runner error: {e}"))
            }
        };

        // Timestamp belongs to pipeline completion, not intake.
        let mut record = BuildRecord {
            id: self.store.next_id().await,
            commit_hash: event.commit_hash.clone(),
            branch: event.branch.clone(),
            created_at: Utc::now().format(CREATED_AT_FORMAT).to_string(),
            install: outcome.install,
            compile: outcome.compile,
            test: outcome.test,
            persisted_locally: self.local,
        };

        let persisted = match self.store.insert(record.clone()).await {
            Ok(()) => true,
            Err(StoreError::DuplicateId(id)) => {
                tracing::warn!(build_id = id, "Build id collision, re-allocating once");
                record.id = self.store.next_id().await;
                match self.store.insert(record.clone()).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::error!(
                            commit = %record.commit_hash,
                            "Build left unrecorded after retry: {e}"
                        );
                        false
                    }
                }
            }
            Err(e) => {
                tracing::error!(commit = %record.commit_hash, "Build left unrecorded: {e}");
                false
            }
        };

        let success = record.overall_success();
        let duration_ms = start.elapsed().as_millis() as u64;
        crate::metrics::build_completed(if success { "success" } else { "failure" });
        crate::metrics::build_duration(duration_ms);

        let (state, description) = if success {
            (CommitState::Success, "All tests passed")
        } else {
            (CommitState::Failure, "Build failed")
        };
        report_best_effort(self.reporter.as_ref(), &event, state, description).await;

        tracing::info!(
            build_id = record.id,
            commit = %record.commit_hash,
            success,
            persisted,
            duration_ms,
            "Build finished"
        );
    }
}
