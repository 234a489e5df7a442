// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runs task scripts with `sh -c`.
//!
//! Output of each build goes to `<logs>/<task>/<item>.log`. The build's
//! parameters are exported to the script's environment alongside
//! `FM_TASK`, `FM_ITEM`, `FM_COMPUTER` and `FM_EXECUTOR`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use fm_core::{BuildResult, ItemId};
use fm_engine::{RunContext, RunError, TaskRunner};
use tokio::process::Command;
use tracing::{debug, warn};

pub struct ShellRunner {
    script: String,
    logs_dir: PathBuf,
    unstable_exit_code: Option<i32>,
}

impl ShellRunner {
    pub fn new(script: impl Into<String>, logs_dir: PathBuf) -> Self {
        Self {
            script: script.into(),
            logs_dir,
            unstable_exit_code: None,
        }
    }

    pub fn with_unstable_exit_code(mut self, code: Option<i32>) -> Self {
        self.unstable_exit_code = code;
        self
    }

    fn result_for(&self, code: Option<i32>) -> BuildResult {
        match code {
            Some(0) => BuildResult::Success,
            Some(code) if Some(code) == self.unstable_exit_code => BuildResult::Unstable,
            // Killed by a signal we did not send
            _ => BuildResult::Failure,
        }
    }
}

/// Log file of one build
pub fn build_log_path(logs_dir: &Path, task: &str, item: ItemId) -> PathBuf {
    logs_dir.join(task).join(format!("{}.log", item))
}

#[async_trait]
impl TaskRunner for ShellRunner {
    async fn run(&self, ctx: RunContext) -> Result<BuildResult, RunError> {
        let log_path = build_log_path(&self.logs_dir, ctx.task.id.as_str(), ctx.item);
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let log = std::fs::File::create(&log_path)?;

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&self.script)
            .envs(ctx.parameters())
            .env("FM_TASK", ctx.task.id.as_str())
            .env("FM_ITEM", ctx.item.to_string())
            .env("FM_COMPUTER", ctx.computer.as_str())
            .env("FM_EXECUTOR", ctx.executor.to_string())
            .stdin(Stdio::null())
            .stdout(log.try_clone()?)
            .stderr(log)
            .process_group(0)
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;
        debug!(pid = child.id(), log = %log_path.display(), "script started");

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                let result = self.result_for(status.code());
                debug!(code = status.code(), %result, "script exited");
                Ok(result)
            }
            _ = ctx.cancel.cancelled() => {
                // The script leads its own group; take its children down with it
                if let Some(pgid) = child.id() {
                    if !kill_group(pgid).await {
                        warn!(pgid, "failed to signal script process group");
                    }
                }
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to kill interrupted script");
                }
                Err(RunError::Interrupted)
            }
        }
    }
}

/// SIGKILL every process in group `pgid`
async fn kill_group(pgid: u32) -> bool {
    Command::new("kill")
        .args(["-9", "--", &format!("-{}", pgid)])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
