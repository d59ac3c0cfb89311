//! GitHub integration — commit status reporting.

use async_trait::async_trait;

use crate::config::CiConfig;
use crate::models::push_event::PushEvent;

/// The three states of the commit-status protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitState {
    Pending,
    Success,
    Failure,
}

impl CommitState {
    /// Wire name expected by the GitHub statuses API.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitState::Pending => "pending",
            CommitState::Success => "success",
            CommitState::Failure => "failure",
        }
    }
}

/// Boundary to the external commit-status API.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(
        &self,
        event: &PushEvent,
        state: CommitState,
        description: &str,
    ) -> anyhow::Result<()>;
}

/// Reports build state to the GitHub statuses API for the pushed commit.
pub struct GithubStatusReporter {
    token: String,
    context: String,
    dashboard_url: String,
    api_base: String,
    client: reqwest::Client,
}

impl GithubStatusReporter {
    pub fn from_config(config: &CiConfig) -> Self {
        Self {
            token: config.github_token.clone(),
            context: config.status_context.clone(),
            dashboard_url: config.dashboard_url.clone(),
            api_base: "https://api.github.com".to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl StatusReporter for GithubStatusReporter {
    async fn report(
        &self,
        event: &PushEvent,
        state: CommitState,
        description: &str,
    ) -> anyhow::Result<()> {
        if self.token.is_empty() {
            tracing::debug!("GitHub token not set, skipping status update");
            return Ok(());
        }

        let url = format!(
            "{}/repos/{}/{}/statuses/{}",
            self.api_base, event.owner, event.repo, event.after_sha
        );
        let body = serde_json::json!({
            "state": state.as_str(),
            "description": description,
            "target_url": format!("{}/api/builds", self.dashboard_url),
            "context": self.context,
        });

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "relay-ci")
            .json(&body)
            .send()
            .await?;

        // An API rejection (auth error, rate limit) is a failed report like
        // any transport error; the caller logs and counts it.
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("GitHub status update failed: {status} {text}");
        }

        Ok(())
    }
}

/// Fire-and-forget reporting: status updates are an observability signal,
/// never a gate on the build record. Errors are logged and counted only.
pub async fn report_best_effort(
    reporter: &dyn StatusReporter,
    event: &PushEvent,
    state: CommitState,
    description: &str,
) {
    if let Err(e) = reporter.report(event, state, description).await {
        crate::metrics::status_report_failed(state.as_str());
        tracing::warn!(
            commit = %event.commit_hash,
            state = state.as_str(),
            "Commit status report failed: {e}"
        );
    }
}
