//! Webhook intake — turns a raw push payload into a validated [`PushEvent`].
//!
//! Ping events never reach this parser; they are acknowledged at the
//! transport layer (`routes/webhook.rs`) based on the event-type header.

use thiserror::Error;

use crate::models::push_event::PushEvent;

/// 7-char truncation of the all-zero SHA GitHub sends when a branch is deleted.
pub const DELETED_BRANCH_SHA: &str = "0000000";

#[derive(Debug, Error)]
pub enum IntakeError {
    /// The push deleted a branch — there is no commit to build.
    #[error("push deleted a branch, nothing to build")]
    NotBuildable,
    /// A required payload field is absent or unusable.
    #[error("push payload missing required field: {0}")]
    Malformed(&'static str),
}

/// Parse a GitHub push payload into a [`PushEvent`].
///
/// Rejects branch deletions (`NotBuildable`) before they can enter the
/// pipeline, and payloads with missing fields (`Malformed`) — the caller
/// logs and drops those.
pub fn parse(payload: &serde_json::Value) -> Result<PushEvent, IntakeError> {
    let branch = payload["ref"]
        .as_str()
        .and_then(|r| r.strip_prefix("refs/heads/"))
        .filter(|b| !b.is_empty())
        .ok_or(IntakeError::Malformed("ref"))?;

    let after_sha = payload["after"]
        .as_str()
        .filter(|a| a.len() >= 7 && a.is_ascii())
        .ok_or(IntakeError::Malformed("after"))?;
    let commit_hash = &after_sha[..7];

    if commit_hash == DELETED_BRANCH_SHA {
        return Err(IntakeError::NotBuildable);
    }

    let owner = payload["repository"]["owner"]["name"]
        .as_str()
        .or_else(|| payload["repository"]["owner"]["login"].as_str())
        .filter(|o| !o.is_empty())
        .ok_or(IntakeError::Malformed("repository.owner"))?;

    let repo = payload["repository"]["name"]
        .as_str()
        .filter(|r| !r.is_empty())
        .ok_or(IntakeError::Malformed("repository.name"))?;

    Ok(PushEvent {
        branch: branch.to_string(),
        commit_hash: commit_hash.to_string(),
        after_sha: after_sha.to_string(),
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}
