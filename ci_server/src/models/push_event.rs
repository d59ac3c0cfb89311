//! A validated GitHub push notification.

/// Push event extracted from a webhook payload. Transient — never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushEvent {
    /// Branch name, the segment after `refs/heads/` in the payload ref.
    pub branch: String,
    /// First 7 hex characters of the pushed commit SHA.
    pub commit_hash: String,
    /// Full "after" SHA from the payload, used for status reporting.
    pub after_sha: String,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub repo: String,
}
