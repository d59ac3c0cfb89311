//! Build history store — durable, concurrency-safe collection of build
//! outcomes keyed by unique id.
//!
//! Every mutation goes through a single mutex, so id allocation followed by
//! insertion behaves as one atomic increment-and-check: two builds completing
//! at the same instant can never be handed the same id or overwrite each
//! other's record. Each successful insert is flushed to the history file
//! before returning.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::models::build::BuildRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a build with id {0} is already present in the history")]
    DuplicateId(u64),
    #[error("failed to encode build history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to persist build history: {0}")]
    Persist(#[from] std::io::Error),
}

/// History operations the orchestrator depends on. [`BuildStore`] is the
/// durable implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn next_id(&self) -> u64;
    async fn insert(&self, record: BuildRecord) -> Result<(), StoreError>;
    async fn find(&self, id: u64) -> Option<BuildRecord>;
    async fn all(&self) -> Vec<BuildRecord>;
}

#[derive(Debug)]
struct StoreInner {
    records: Vec<BuildRecord>,
    /// Next id to hand out. Always `max(existing ids) + 1` when no
    /// allocation is in flight; 1 for an empty history.
    next_id: u64,
}

/// Append-only build history backed by a JSON file.
#[derive(Debug)]
pub struct BuildStore {
    inner: Mutex<StoreInner>,
    path: PathBuf,
}

impl BuildStore {
    /// Load the history file, or start empty when it does not exist yet.
    pub async fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();

        let records: Vec<BuildRecord> = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupt build history at {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("cannot read build history at {}", path.display()))
            }
        };

        let next_id = records.iter().map(|r| r.id).max().map_or(1, |max| max + 1);
        tracing::info!(
            path = %path.display(),
            builds = records.len(),
            next_id,
            "Build history loaded"
        );

        Ok(Self {
            inner: Mutex::new(StoreInner { records, next_id }),
            path,
        })
    }

    /// Allocate the next build id. Concurrent callers always receive
    /// distinct values.
    pub async fn next_id(&self) -> u64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    /// Append a record and flush the history to disk. Rejects an id that is
    /// already present instead of overwriting.
    pub async fn insert(&self, record: BuildRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::DuplicateId(record.id));
        }

        // Records built with an external id must still push the counter past it.
        inner.next_id = inner.next_id.max(record.id + 1);
        inner.records.push(record);

        if let Err(e) = flush(&self.path, &inner.records).await {
            // Keep memory consistent with disk: the failed record is not kept.
            inner.records.pop();
            return Err(e);
        }

        Ok(())
    }

    /// Look up one build by id.
    pub async fn find(&self, id: u64) -> Option<BuildRecord> {
        let inner = self.inner.lock().await;
        inner.records.iter().find(|r| r.id == id).cloned()
    }

    /// Insertion-ordered snapshot of the full history.
    pub async fn all(&self) -> Vec<BuildRecord> {
        let inner = self.inner.lock().await;
        inner.records.clone()
    }
}

#[async_trait]
impl HistoryStore for BuildStore {
    async fn next_id(&self) -> u64 {
        BuildStore::next_id(self).await
    }

    async fn insert(&self, record: BuildRecord) -> Result<(), StoreError> {
        BuildStore::insert(self, record).await
    }

    async fn find(&self, id: u64) -> Option<BuildRecord> {
        BuildStore::find(self, id).await
    }

    async fn all(&self) -> Vec<BuildRecord> {
        BuildStore::all(self).await
    }
}

/// Write the full history to a temp file, then rename it into place so a
/// crash mid-write never truncates existing history.
async fn flush(path: &Path, records: &[BuildRecord]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(records)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
