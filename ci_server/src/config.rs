//! Orchestrator configuration — loaded from environment variables.

#[derive(Clone, Debug)]
pub struct CiConfig {
    /// GitHub personal access token for the commit-status API.
    pub github_token: String,
    /// Context string shown next to the status on GitHub.
    pub status_context: String,
    /// Base URL used as the status target link.
    pub dashboard_url: String,
    /// Directory the pipeline stages run in.
    pub workspace_dir: String,
    /// Shell command for the install stage.
    pub install_cmd: String,
    /// Shell command for the compile stage.
    pub compile_cmd: String,
    /// Shell command for the test stage.
    pub test_cmd: String,
    /// Skip remaining stages once one fails.
    pub short_circuit: bool,
    /// Per-stage timeout in seconds; 0 disables the timeout.
    pub stage_timeout_secs: u64,
    /// Local/offline execution mode, recorded on every build.
    pub local: bool,
}

impl CiConfig {
    pub fn from_env() -> Self {
        let github_token = std::env::var("CI_GITHUB_TOKEN").unwrap_or_default();
        let status_context =
            std::env::var("CI_STATUS_CONTEXT").unwrap_or_else(|_| "relay-ci".to_string());
        let dashboard_url = std::env::var("CI_DASHBOARD_URL")
            .unwrap_or_else(|_| "http://localhost:9090".to_string());
        let workspace_dir = std::env::var("CI_WORKSPACE_DIR").unwrap_or_else(|_| ".".to_string());
        let install_cmd = std::env::var("CI_INSTALL_CMD")
            .unwrap_or_else(|_| "echo 'install step not configured'".to_string());
        let compile_cmd = std::env::var("CI_COMPILE_CMD")
            .unwrap_or_else(|_| "echo 'compile step not configured'".to_string());
        let test_cmd = std::env::var("CI_TEST_CMD")
            .unwrap_or_else(|_| "echo 'test step not configured'".to_string());
        let short_circuit = std::env::var("CI_SHORT_CIRCUIT")
            .map(|s| s != "false" && s != "0")
            .unwrap_or(true);
        let stage_timeout_secs = std::env::var("CI_STAGE_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(600);
        let local = std::env::var("CI_LOCAL")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false);

        if github_token.is_empty() {
            tracing::warn!("CI_GITHUB_TOKEN not set -- commit status updates disabled");
        }

        Self {
            github_token,
            status_context,
            dashboard_url,
            workspace_dir,
            install_cmd,
            compile_cmd,
            test_cmd,
            short_circuit,
            stage_timeout_secs,
            local,
        }
    }
}
