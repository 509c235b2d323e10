// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aider executor.
//!
//! Aider edits files and commits as it goes, attributing commits to
//! `Author Name (aider)`. It has no structured output mode worth parsing,
//! so its stdout surfaces as preamble text and recovery is git-based:
//! recent aider-authored commits in the working directory are the
//! forensic trail.

use crate::stream::ExecutionStream;
use crate::subprocess::spawn_streaming;
use crate::{ExecutionRequest, Executor, ExecutorError, LaunchSpec};
use async_trait::async_trait;
use oneshot_core::{ActivityEvent, RecoveryResult, VerdictHint};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// How far back recovery looks for aider commits.
const RECOVERY_WINDOW: &str = "2 hours ago";
const GIT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct AiderExecutor;

impl AiderExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for AiderExecutor {
    fn name(&self) -> &'static str {
        "aider"
    }

    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        let mut argv = vec![
            "aider".to_string(),
            "--message".to_string(),
            request.prompt.clone(),
            "--yes-always".to_string(),
            "--no-pretty".to_string(),
            "--no-stream".to_string(),
        ];
        if let Some(model) = &request.model {
            argv.push("--model".to_string());
            argv.push(model.clone());
        }
        Ok(LaunchSpec {
            argv,
            env: Vec::new(),
            stdin_payload: None,
            // --no-pretty keeps aider line-buffered over pipes
            use_pty: false,
        })
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError> {
        let spec = self.build_command(request)?;
        let (child, rx) = spawn_streaming(&spec, &request.workdir)?;
        Ok(ExecutionStream::from_child(rx, child))
    }

    fn translate(&self, _value: &Value) -> Vec<ActivityEvent> {
        // Aider emits prose, not JSON; braces in its diffs are not records.
        Vec::new()
    }

    async fn recover(&self, _oneshot_id: &str, workdir: &Path) -> RecoveryResult {
        recover_from_git(workdir).await
    }

    fn should_capture_git_commit(&self) -> bool {
        true
    }
}

/// Inspect the working directory's git state for evidence of progress.
async fn recover_from_git(workdir: &Path) -> RecoveryResult {
    let commits = match git_output(
        workdir,
        &[
            "log",
            "--since",
            RECOVERY_WINDOW,
            "--pretty=%h%x09%an%x09%s",
            "-n",
            "20",
        ],
    )
    .await
    {
        Ok(out) => out,
        Err(reason) => return RecoveryResult::dead(reason),
    };

    let aider_commits: Vec<&str> = commits
        .lines()
        .filter(|line| {
            line.split('\t')
                .nth(1)
                .is_some_and(|author| author.contains("(aider)"))
        })
        .collect();

    if !aider_commits.is_empty() {
        let events = aider_commits
            .iter()
            .map(|line| {
                let subject = line.split('\t').nth(2).unwrap_or(line);
                ActivityEvent::CompletionResult {
                    text: format!("commit: {}", subject),
                }
            })
            .collect();
        return RecoveryResult::found(
            VerdictHint::Success,
            events,
            format!("{} aider commit(s) in {}", aider_commits.len(), workdir.display()),
        );
    }

    // No commits; uncommitted changes still count as partial progress.
    match git_output(workdir, &["status", "--porcelain"]).await {
        Ok(status) if !status.trim().is_empty() => RecoveryResult::found(
            VerdictHint::Partial,
            vec![ActivityEvent::ToolOutput {
                tool: "git".to_string(),
                content: format!("uncommitted changes:\n{}", status.trim_end()),
                exit_code: Some(0),
            }],
            format!("dirty worktree in {}", workdir.display()),
        ),
        Ok(_) => RecoveryResult::dead(format!(
            "no aider commits or changes in {}",
            workdir.display()
        )),
        Err(reason) => RecoveryResult::dead(reason),
    }
}

/// Run a git command with a timeout, returning stdout.
async fn git_output(workdir: &Path, args: &[&str]) -> Result<String, String> {
    let mut cmd = tokio::process::Command::new("git");
    cmd.args(args).current_dir(workdir).kill_on_drop(true);

    let output = match tokio::time::timeout(GIT_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(format!("git {} failed: {}", args.join(" "), e)),
        Err(_) => {
            return Err(format!(
                "git {} timed out after {}s",
                args.join(" "),
                GIT_TIMEOUT.as_secs()
            ))
        }
    };

    if !output.status.success() {
        return Err(format!(
            "git {} exited {:?}",
            args.join(" "),
            output.status.code()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
#[path = "aider_tests.rs"]
mod tests;
