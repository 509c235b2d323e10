// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude Code executor.
//!
//! Runs `claude -p` with stream-json output and translates the event
//! stream. Claude keeps its own per-project session logs under
//! `~/.claude/projects/<munged-path>/<session>.jsonl`; recovery scans
//! those for the correlation id to salvage results from a killed worker.

use crate::stream::ExecutionStream;
use crate::subprocess::spawn_streaming;
use crate::{ExecutionRequest, Executor, ExecutorError, LaunchSpec};
use async_trait::async_trait;
use oneshot_core::{ActivityEvent, MessageRole, RecoveryResult, VerdictHint};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// How many recent session logs to inspect during recovery.
const RECOVERY_CANDIDATES: usize = 5;
/// How many trailing records to translate into recovered activity.
const RECOVERY_TAIL: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct ClaudeExecutor;

impl ClaudeExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ClaudeExecutor {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        let mut argv = vec![
            "claude".to_string(),
            "-p".to_string(),
            request.prompt.clone(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
        ];
        if let Some(model) = &request.model {
            argv.push("--model".to_string());
            argv.push(model.clone());
        }
        Ok(LaunchSpec {
            argv,
            env: Vec::new(),
            stdin_payload: None,
            // claude switches to full buffering when stdout is a pipe
            use_pty: true,
        })
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError> {
        let spec = self.build_command(request)?;
        let (child, rx) = spawn_streaming(&spec, &request.workdir)?;
        Ok(ExecutionStream::from_child(rx, child))
    }

    fn translate(&self, value: &Value) -> Vec<ActivityEvent> {
        translate_stream_json(value)
    }

    async fn recover(&self, oneshot_id: &str, workdir: &Path) -> RecoveryResult {
        recover_from_session_logs(oneshot_id, workdir, &crate::env::claude_config_dir())
    }

    fn should_capture_git_commit(&self) -> bool {
        true
    }
}

/// Translate one stream-json record into unified events.
///
/// The same record shapes appear in Claude's on-disk session logs, so
/// recovery reuses this translation.
pub(crate) fn translate_stream_json(value: &Value) -> Vec<ActivityEvent> {
    let mut events = Vec::new();
    let record_type = value.get("type").and_then(|v| v.as_str()).unwrap_or("");

    match record_type {
        "assistant" => {
            let Some(content) = value
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_array())
            else {
                return events;
            };
            for block in content {
                match block.get("type").and_then(|v| v.as_str()) {
                    Some("text") => {
                        if let Some(text) = block.get("text").and_then(|v| v.as_str()) {
                            if !text.trim().is_empty() {
                                events.push(ActivityEvent::Message {
                                    role: MessageRole::Assistant,
                                    content: text.to_string(),
                                });
                            }
                        }
                    }
                    Some("thinking") => {
                        if let Some(text) = block.get("thinking").and_then(|v| v.as_str()) {
                            events.push(ActivityEvent::Thought {
                                text: text.to_string(),
                            });
                        }
                    }
                    Some("tool_use") => {
                        let tool = block
                            .get("name")
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown")
                            .to_string();
                        let input = block.get("input");
                        let command = input
                            .and_then(|i| i.get("command").or_else(|| i.get("file_path")))
                            .and_then(|v| v.as_str())
                            .map(String::from);
                        let reason = input
                            .and_then(|i| i.get("description"))
                            .and_then(|v| v.as_str())
                            .map(String::from);
                        events.push(ActivityEvent::ToolUse {
                            tool,
                            command,
                            reason,
                        });
                    }
                    _ => {}
                }
            }
        }

        "user" => {
            // Tool results come back as user-role content blocks.
            let Some(content) = value
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_array())
            else {
                return events;
            };
            for block in content {
                if block.get("type").and_then(|v| v.as_str()) == Some("tool_result") {
                    let text = tool_result_text(block);
                    if !text.is_empty() {
                        events.push(ActivityEvent::ToolOutput {
                            tool: "tool".to_string(),
                            content: text,
                            exit_code: None,
                        });
                    }
                }
            }
        }

        "result" => {
            let is_error = value
                .get("is_error")
                .and_then(|v| v.as_bool())
                .unwrap_or(false)
                || value.get("subtype").and_then(|v| v.as_str()) == Some("error");
            let text = value
                .get("result")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            if is_error {
                events.push(ActivityEvent::Error {
                    kind: "agent".to_string(),
                    message: if text.is_empty() {
                        "agent reported an error result".to_string()
                    } else {
                        text
                    },
                });
            } else {
                events.push(ActivityEvent::CompletionResult { text });
            }
        }

        // Init/system records carry no activity.
        _ => {
            if let Some(err) = value.get("error").and_then(|v| v.as_str()) {
                events.push(ActivityEvent::Error {
                    kind: "api".to_string(),
                    message: err.to_string(),
                });
            }
        }
    }

    events
}

fn tool_result_text(block: &Value) -> String {
    match block.get("content") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|v| v.as_str()))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// Convert a project path to Claude's directory name format (replace `/`
/// and `.` with `-`). Claude canonicalizes internally, so we must match.
fn project_dir_name(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    canonical.to_string_lossy().replace(['/', '.'], "-")
}

/// Scan recent session logs for the correlation id and translate the
/// trailing records of the first match.
fn recover_from_session_logs(
    oneshot_id: &str,
    workdir: &Path,
    config_dir: &Path,
) -> RecoveryResult {
    let project_dir = config_dir.join("projects").join(project_dir_name(workdir));

    let mut candidates: Vec<PathBuf> = match std::fs::read_dir(&project_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|x| x == "jsonl"))
            .collect(),
        Err(_) => {
            return RecoveryResult::dead(format!(
                "no claude session directory at {}",
                project_dir.display()
            ))
        }
    };
    candidates.sort_by_key(|p| {
        std::fs::metadata(p)
            .and_then(|m| m.modified())
            .ok()
    });
    candidates.reverse();

    for path in candidates.into_iter().take(RECOVERY_CANDIDATES) {
        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };
        if !raw.contains(oneshot_id) {
            continue;
        }
        return analyze_session_log(&raw, &path);
    }

    RecoveryResult::dead(format!(
        "no claude session mentioning the correlation id under {}",
        project_dir.display()
    ))
}

/// Decide the verdict hint from a matched session log.
///
/// A log whose final record is an assistant text message means the agent
/// finished with an answer (zombie success); trailing tool activity means
/// it died mid-work (partial); no assistant output at all means dead.
fn analyze_session_log(raw: &str, path: &Path) -> RecoveryResult {
    let records: Vec<Value> = raw
        .lines()
        .filter_map(|line| serde_json::from_str(line.trim()).ok())
        .collect();

    let mut translated: Vec<ActivityEvent> = Vec::new();
    for record in &records {
        translated.extend(translate_stream_json(record));
    }

    let last_text = translated.iter().rev().find_map(|e| match e {
        ActivityEvent::Message {
            role: MessageRole::Assistant,
            content,
        } => Some(content.clone()),
        ActivityEvent::CompletionResult { text } => Some(text.clone()),
        _ => None,
    });

    let Some(final_text) = last_text else {
        return RecoveryResult::dead(format!(
            "session log {} has no assistant output",
            path.display()
        ));
    };

    let finished_clean = matches!(
        translated.last(),
        Some(ActivityEvent::Message {
            role: MessageRole::Assistant,
            ..
        }) | Some(ActivityEvent::CompletionResult { .. })
    );

    let mut tail: Vec<ActivityEvent> = translated
        .iter()
        .rev()
        .take(RECOVERY_TAIL)
        .cloned()
        .collect();
    tail.reverse();

    if finished_clean {
        tail.push(ActivityEvent::CompletionResult { text: final_text });
        RecoveryResult::found(
            VerdictHint::Success,
            tail,
            format!("final assistant message in {}", path.display()),
        )
    } else {
        RecoveryResult::found(
            VerdictHint::Partial,
            tail,
            format!("trailing tool activity in {}", path.display()),
        )
    }
}

#[cfg(test)]
#[path = "claude_tests.rs"]
mod tests;
