//! Read-only JSON API over the build history.

use serde::Serialize;

use crate::models::build::{BuildRecord, StageResult};
use crate::store::BuildStore;

/// One row in the history listing. No raw logs — those live on the detail view.
#[derive(Debug, Serialize)]
pub struct BuildSummaryJson {
    pub id: u64,
    pub commit_hash: String,
    pub branch: String,
    pub created_at: String,
    pub install_succeeded: bool,
    pub compile_succeeded: bool,
    pub test_succeeded: bool,
    pub status: &'static str,
}

/// Full build detail including raw stage logs.
#[derive(Debug, Serialize)]
pub struct BuildJson {
    pub id: u64,
    pub commit_hash: String,
    pub branch: String,
    pub created_at: String,
    pub install: StageJson,
    pub compile: StageJson,
    pub test: StageJson,
    pub persisted_locally: bool,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StageJson {
    pub succeeded: bool,
    pub logs: String,
}

impl From<StageResult> for StageJson {
    fn from(stage: StageResult) -> Self {
        Self {
            succeeded: stage.succeeded,
            logs: stage.logs,
        }
    }
}

fn status_of(record: &BuildRecord) -> &'static str {
    if record.overall_success() {
        "success"
    } else {
        "failure"
    }
}

/// List builds, newest first, capped at `limit`.
pub async fn list_builds(store: &BuildStore, limit: usize) -> Vec<BuildSummaryJson> {
    store
        .all()
        .await
        .into_iter()
        .rev()
        .take(limit)
        .map(|record| BuildSummaryJson {
            status: status_of(&record),
            id: record.id,
            commit_hash: record.commit_hash,
            branch: record.branch,
            created_at: record.created_at,
            install_succeeded: record.install.succeeded,
            compile_succeeded: record.compile.succeeded,
            test_succeeded: record.test.succeeded,
        })
        .collect()
}

/// Get a build by id with its raw logs.
pub async fn get_build(store: &BuildStore, build_id: u64) -> Option<BuildJson> {
    let record = store.find(build_id).await?;
    Some(BuildJson {
        status: status_of(&record),
        id: record.id,
        commit_hash: record.commit_hash,
        branch: record.branch,
        created_at: record.created_at,
        install: record.install.into(),
        compile: record.compile.into(),
        test: record.test.into(),
        persisted_locally: record.persisted_locally,
    })
}
