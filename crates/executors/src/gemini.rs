// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gemini CLI executor.
//!
//! `gemini -p` streams mostly plain text; with JSON output enabled the
//! final record carries the response. Gemini keeps no per-task state
//! directory keyed by anything we control, so recovery has nothing to
//! examine and reports dead.

use crate::stream::ExecutionStream;
use crate::subprocess::spawn_streaming;
use crate::{ExecutionRequest, Executor, ExecutorError, LaunchSpec};
use async_trait::async_trait;
use oneshot_core::{ActivityEvent, RecoveryResult};
use serde_json::Value;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct GeminiExecutor;

impl GeminiExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for GeminiExecutor {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        let mut argv = vec![
            "gemini".to_string(),
            "-p".to_string(),
            request.prompt.clone(),
            "--output-format".to_string(),
            "json".to_string(),
        ];
        if let Some(model) = &request.model {
            argv.push("-m".to_string());
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
        // The JSON output mode emits one envelope at the end; everything
        // else surfaces as preamble text via the extraction stage.
        if let Some(response) = value.get("response").and_then(|v| v.as_str()) {
            return vec![ActivityEvent::CompletionResult {
                text: response.to_string(),
            }];
        }
        if let Some(error) = value.get("error") {
            let message = error
                .as_str()
                .map(String::from)
                .or_else(|| {
                    error
                        .get("message")
                        .and_then(|v| v.as_str())
                        .map(String::from)
                })
                .unwrap_or_else(|| error.to_string());
            return vec![ActivityEvent::Error {
                kind: "api".to_string(),
                message,
            }];
        }
        Vec::new()
    }

    async fn recover(&self, _oneshot_id: &str, _workdir: &Path) -> RecoveryResult {
        RecoveryResult::dead("gemini keeps no recoverable task state")
    }

    fn should_capture_git_commit(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[path = "gemini_tests.rs"]
mod tests;
