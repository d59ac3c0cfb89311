//! BuildRecord — the persisted, immutable outcome of one pipeline run.

use serde::{Deserialize, Serialize};

/// Timestamp format for `BuildRecord::created_at` (UTC, second precision).
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of a single pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageResult {
    pub succeeded: bool,
    /// Raw, possibly multi-line stage output.
    pub logs: String,
}

impl StageResult {
    pub fn ok(logs: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            logs: logs.into(),
        }
    }

    pub fn failed(logs: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            logs: logs.into(),
        }
    }
}

/// One entry in the build history. Created once after pipeline completion,
/// appended exactly once to the store, never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Unique, monotonically increasing build id.
    pub id: u64,
    /// First 7 hex characters of the built commit SHA.
    pub commit_hash: String,
    pub branch: String,
    /// Formatted with [`CREATED_AT_FORMAT`], taken at record construction.
    pub created_at: String,
    pub install: StageResult,
    pub compile: StageResult,
    pub test: StageResult,
    /// Whether this record was produced under local/offline execution.
    /// Provenance only — no business logic depends on it.
    pub persisted_locally: bool,
}

impl BuildRecord {
    /// A build succeeds only when every stage succeeded.
    pub fn overall_success(&self) -> bool {
        self.install.succeeded && self.compile.succeeded && self.test.succeeded
    }
}
