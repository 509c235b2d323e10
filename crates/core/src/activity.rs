// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified activity events and the NDJSON envelope.
//!
//! Executors translate their native output into [`ActivityEvent`] variants;
//! everything downstream (log, UI, result extraction) consumes only this
//! form. The envelope wraps one event with its ingress timestamp.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which agent role produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorRole {
    Worker,
    Auditor,
}

impl fmt::Display for ExecutorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutorRole::Worker => write!(f, "worker"),
            ExecutorRole::Auditor => write!(f, "auditor"),
        }
    }
}

/// Role of a chat message inside an agent's conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Assistant,
    User,
    System,
}

/// Executor-agnostic representation of one agent action.
///
/// Serializes with `{"type": "...", ...fields}`, same tagging convention
/// as the rest of the wire types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityEvent {
    /// Unstructured agent preamble text (banner lines, progress noise)
    Preamble { text: String },

    /// Model internal reasoning
    Thought { text: String },

    /// A chat message
    Message { role: MessageRole, content: String },

    /// Agent invoking an external tool
    ToolUse {
        tool: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Result of a tool invocation
    ToolOutput {
        tool: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
    },

    /// Synthetic: an HTTP executor started its request
    ApiRequestStarted {
        model: String,
        prompt_length: usize,
        endpoint: String,
    },

    /// Synthetic: an HTTP executor received its response
    ApiResponseReceived {
        content_length: usize,
        duration_ms: u64,
    },

    /// The agent's final answer, the score anchor for result extraction
    CompletionResult { text: String },

    /// Agent-reported failure
    Error { kind: String, message: String },
}

impl ActivityEvent {
    /// Concatenated human-readable text of the event, used for scoring
    /// and for assembling auditor/worker prompt context.
    pub fn full_text(&self) -> String {
        match self {
            ActivityEvent::Preamble { text }
            | ActivityEvent::Thought { text }
            | ActivityEvent::CompletionResult { text } => text.clone(),
            ActivityEvent::Message { content, .. } => content.clone(),
            ActivityEvent::ToolUse {
                tool,
                command,
                reason,
            } => {
                let mut out = tool.clone();
                if let Some(cmd) = command {
                    out.push(' ');
                    out.push_str(cmd);
                }
                if let Some(why) = reason {
                    out.push_str(" (");
                    out.push_str(why);
                    out.push(')');
                }
                out
            }
            ActivityEvent::ToolOutput {
                content, exit_code, ..
            } => match exit_code {
                Some(code) => format!("{} (exit {})", content, code),
                None => content.clone(),
            },
            ActivityEvent::ApiRequestStarted {
                model, endpoint, ..
            } => format!("request to {} ({})", endpoint, model),
            ActivityEvent::ApiResponseReceived {
                content_length,
                duration_ms,
            } => format!("response: {} bytes in {}ms", content_length, duration_ms),
            ActivityEvent::Error { kind, message } => format!("{}: {}", kind, message),
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, ActivityEvent::CompletionResult { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ActivityEvent::Error { .. })
    }
}

/// One NDJSON line of the activity log.
///
/// `ts_ms` is ingress time assigned by the pipeline, independent of any
/// timestamps inside `data`. Heartbeat envelopes reach the UI but are
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEnvelope {
    pub ts_ms: i64,
    pub executor: ExecutorRole,
    pub oneshot_id: String,
    pub data: ActivityEvent,
    #[serde(default)]
    pub is_heartbeat: bool,
}

impl ActivityEnvelope {
    pub fn new(ts_ms: i64, executor: ExecutorRole, oneshot_id: &str, data: ActivityEvent) -> Self {
        Self {
            ts_ms,
            executor,
            oneshot_id: oneshot_id.to_string(),
            data,
            is_heartbeat: false,
        }
    }

    /// Synthetic liveness envelope for downstream consumers.
    pub fn heartbeat(ts_ms: i64, executor: ExecutorRole, oneshot_id: &str) -> Self {
        Self {
            ts_ms,
            executor,
            oneshot_id: oneshot_id.to_string(),
            data: ActivityEvent::Preamble {
                text: String::new(),
            },
            is_heartbeat: true,
        }
    }

    pub fn full_text(&self) -> String {
        self.data.full_text()
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
