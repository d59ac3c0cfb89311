//! Pipeline runner — executes the install/compile/test stages as shell
//! commands and captures their output.

use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::CiConfig;
use crate::models::build::StageResult;

/// Per-field log cap; older output is dropped, the tail is what matters.
const MAX_LOG_BYTES: usize = 65536;

/// Results of all three pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub install: StageResult,
    pub compile: StageResult,
    pub test: StageResult,
}

impl PipelineOutcome {
    /// Synthesized outcome for a build whose runner invocation itself failed.
    /// Every stage is marked failed and carries the diagnostic.
    pub fn runner_failure(diagnostic: &str) -> Self {
        Self {
            install: StageResult::failed(diagnostic),
            compile: StageResult::failed(diagnostic),
            test: StageResult::failed(diagnostic),
        }
    }
}

/// Boundary to stage execution. The orchestrator awaits `run` to completion
/// and treats a returned [`StageResult`] uniformly whether or not work was
/// actually attempted for that stage.
#[async_trait]
pub trait PipelineRunner: Send + Sync {
    async fn run(&self, branch: &str, commit: &str, local: bool)
        -> anyhow::Result<PipelineOutcome>;
}

/// Default runner: each stage is one configured shell command executed in
/// the workspace directory. Checking out the right commit is the install
/// command's business; the commit and branch are exposed via `CI_*` env vars.
pub struct ShellRunner {
    workspace_dir: String,
    install_cmd: String,
    compile_cmd: String,
    test_cmd: String,
    /// When set, a failed stage skips the remaining stages.
    short_circuit: bool,
    stage_timeout_secs: u64,
}

impl ShellRunner {
    pub fn from_config(config: &CiConfig) -> Self {
        Self {
            workspace_dir: config.workspace_dir.clone(),
            install_cmd: config.install_cmd.clone(),
            compile_cmd: config.compile_cmd.clone(),
            test_cmd: config.test_cmd.clone(),
            short_circuit: config.short_circuit,
            stage_timeout_secs: config.stage_timeout_secs,
        }
    }

    async fn run_stage(
        &self,
        stage: &str,
        command: &str,
        branch: &str,
        commit: &str,
        local: bool,
    ) -> anyhow::Result<StageResult> {
        tracing::info!(stage, command, branch, commit, "Running stage");
        let start = Instant::now();

        let child = Command::new("bash")
            .args(["-c", command])
            .current_dir(&self.workspace_dir)
            .env("CI", "true")
            .env("CI_STAGE", stage)
            .env("CI_BRANCH", branch)
            .env("CI_COMMIT", commit)
            .env("CI_LOCAL", if local { "true" } else { "false" })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let output = if self.stage_timeout_secs > 0 {
            match tokio::time::timeout(
                std::time::Duration::from_secs(self.stage_timeout_secs),
                child.wait_with_output(),
            )
            .await
            {
                Ok(result) => result?,
                Err(_) => {
                    tracing::warn!(stage, "Stage timed out");
                    return Ok(StageResult::failed(format!(
                        "stage timed out after {}s",
                        self.stage_timeout_secs
                    )));
                }
            }
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        crate::metrics::stage_duration(stage, duration_ms);

        let mut logs = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !logs.is_empty() {
                logs.push('\n');
            }
            logs.push_str(&stderr);
        }
        let logs = truncate_logs(logs);

        let succeeded = output.status.success();
        if succeeded {
            tracing::info!(stage, duration_ms, "Stage passed");
        } else {
            tracing::warn!(
                stage,
                exit_code = output.status.code().unwrap_or(-1),
                duration_ms,
                "Stage failed"
            );
        }

        Ok(StageResult { succeeded, logs })
    }
}

#[async_trait]
impl PipelineRunner for ShellRunner {
    async fn run(
        &self,
        branch: &str,
        commit: &str,
        local: bool,
    ) -> anyhow::Result<PipelineOutcome> {
        let install = self
            .run_stage("install", &self.install_cmd, branch, commit, local)
            .await?;

        let compile = if install.succeeded || !self.short_circuit {
            self.run_stage("compile", &self.compile_cmd, branch, commit, local)
                .await?
        } else {
            StageResult::failed("skipped: install failed")
        };

        let test = if (install.succeeded && compile.succeeded) || !self.short_circuit {
            self.run_stage("test", &self.test_cmd, branch, commit, local)
                .await?
        } else {
            StageResult::failed("skipped: earlier stage failed")
        };

        Ok(PipelineOutcome {
            install,
            compile,
            test,
        })
    }
}

fn truncate_logs(logs: String) -> String {
    if logs.len() > MAX_LOG_BYTES {
        let cut = logs.len() - MAX_LOG_BYTES;
        // Stay on a char boundary.
        let cut = (cut..logs.len()).find(|i| logs.is_char_boundary(*i)).unwrap_or(cut);
        format!("...truncated...\n{}", &logs[cut..])
    } else {
        logs
    }
}
