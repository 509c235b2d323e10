// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cline executor.
//!
//! Cline's CLI emits NDJSON `say`/`ask` records and keeps per-task
//! directories (`ui_messages.json`) under its data dir; recovery scans
//! those for the correlation id. Cline's own prompting uses XML-ish tool
//! tags, so oneshot prompts it in Markdown to avoid collisions.

use crate::prompt::PromptDialect;
use crate::stream::ExecutionStream;
use crate::subprocess::spawn_streaming;
use crate::{ExecutionRequest, Executor, ExecutorError, LaunchSpec};
use async_trait::async_trait;
use oneshot_core::{ActivityEvent, MessageRole, RecoveryResult, VerdictHint};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// How many recent task directories to inspect during recovery.
const RECOVERY_CANDIDATES: usize = 8;
/// How many trailing records to translate into recovered activity.
const RECOVERY_TAIL: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ClineExecutor;

impl ClineExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ClineExecutor {
    fn name(&self) -> &'static str {
        "cline"
    }

    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        let mut argv = vec![
            "cline".to_string(),
            "task".to_string(),
            "new".to_string(),
            request.prompt.clone(),
            "--output-format".to_string(),
            "json".to_string(),
            "--yolo".to_string(),
        ];
        if let Some(model) = &request.model {
            argv.push("--model".to_string());
            argv.push(model.clone());
        }
        Ok(LaunchSpec {
            argv,
            env: Vec::new(),
            stdin_payload: None,
            use_pty: true,
        })
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError> {
        let spec = self.build_command(request)?;
        let (child, rx) = spawn_streaming(&spec, &request.workdir)?;
        Ok(ExecutionStream::from_child(rx, child))
    }

    fn translate(&self, value: &Value) -> Vec<ActivityEvent> {
        translate_record(value).into_iter().collect()
    }

    async fn recover(&self, oneshot_id: &str, _workdir: &Path) -> RecoveryResult {
        recover_from_task_dirs(oneshot_id, &crate::env::cline_data_dir())
    }

    fn should_capture_git_commit(&self) -> bool {
        true
    }

    fn dialect(&self) -> PromptDialect {
        PromptDialect::Markdown
    }
}

/// Translate one cline `say`/`ask` record.
pub(crate) fn translate_record(value: &Value) -> Option<ActivityEvent> {
    let text = value
        .get("text")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    if let Some(say) = value.get("say").and_then(|v| v.as_str()) {
        return match say {
            "completion_result" => Some(ActivityEvent::CompletionResult { text }),
            "text" => (!text.trim().is_empty()).then(|| ActivityEvent::Message {
                role: MessageRole::Assistant,
                content: text,
            }),
            "reasoning" => Some(ActivityEvent::Thought { text }),
            "command" => Some(ActivityEvent::ToolUse {
                tool: "command".to_string(),
                command: Some(text),
                reason: None,
            }),
            "command_output" => Some(ActivityEvent::ToolOutput {
                tool: "command".to_string(),
                content: text,
                exit_code: None,
            }),
            "error" => Some(ActivityEvent::Error {
                kind: "agent".to_string(),
                message: text,
            }),
            // api_req_started and friends are bookkeeping, not activity
            _ => None,
        };
    }

    if let Some(ask) = value.get("ask").and_then(|v| v.as_str()) {
        return match ask {
            "command" => Some(ActivityEvent::ToolUse {
                tool: "command".to_string(),
                command: Some(text),
                reason: None,
            }),
            "tool" => Some(ActivityEvent::ToolUse {
                tool: "tool".to_string(),
                command: None,
                reason: (!text.is_empty()).then_some(text),
            }),
            "completion_result" => Some(ActivityEvent::CompletionResult { text }),
            _ => None,
        };
    }

    None
}

/// Scan recent task directories for the correlation id.
fn recover_from_task_dirs(oneshot_id: &str, data_dir: &Path) -> RecoveryResult {
    let tasks_dir = data_dir.join("tasks");
    let mut candidates: Vec<PathBuf> = match std::fs::read_dir(&tasks_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect(),
        Err(_) => {
            return RecoveryResult::dead(format!(
                "no cline tasks directory at {}",
                tasks_dir.display()
            ))
        }
    };
    candidates.sort_by_key(|p| std::fs::metadata(p).and_then(|m| m.modified()).ok());
    candidates.reverse();

    for task_dir in candidates.into_iter().take(RECOVERY_CANDIDATES) {
        let messages_path = task_dir.join("ui_messages.json");
        let Ok(raw) = std::fs::read_to_string(&messages_path) else {
            continue;
        };
        if !raw.contains(oneshot_id) {
            continue;
        }
        return analyze_task_messages(&raw, &messages_path);
    }

    RecoveryResult::dead(format!(
        "no cline task mentioning the correlation id under {}",
        tasks_dir.display()
    ))
}

/// Decide the verdict hint from a matched task's message list.
fn analyze_task_messages(raw: &str, path: &Path) -> RecoveryResult {
    let records: Vec<Value> = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(records)) => records,
        // Some cline builds write NDJSON instead of one array.
        _ => raw
            .lines()
            .filter_map(|line| serde_json::from_str(line.trim()).ok())
            .collect(),
    };

    let translated: Vec<ActivityEvent> =
        records.iter().filter_map(translate_record).collect();

    let completed = translated.iter().any(|e| e.is_completion());
    let has_progress = translated
        .iter()
        .any(|e| matches!(e, ActivityEvent::Message { .. } | ActivityEvent::ToolUse { .. }));

    let mut tail: Vec<ActivityEvent> = translated
        .iter()
        .rev()
        .take(RECOVERY_TAIL)
        .cloned()
        .collect();
    tail.reverse();

    if completed {
        RecoveryResult::found(
            VerdictHint::Success,
            tail,
            format!("completion_result in {}", path.display()),
        )
    } else if has_progress {
        RecoveryResult::found(
            VerdictHint::Partial,
            tail,
            format!("partial task activity in {}", path.display()),
        )
    } else {
        RecoveryResult::dead(format!("no usable activity in {}", path.display()))
    }
}

#[cfg(test)]
#[path = "cline_tests.rs"]
mod tests;
