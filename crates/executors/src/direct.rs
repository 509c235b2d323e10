// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Direct HTTP executor (Ollama-style).
//!
//! One request, one response: the stream is synthesized around the call
//! as `api_request_started` → `api_response_received` →
//! `completion_result`. Stateless, so recovery reports dead, and local
//! models get a small prompt cap.

use crate::stream::{ExecutionStream, ExitSummary, StreamItem};
use crate::{ExecutionRequest, Executor, ExecutorError, LaunchSpec};
use async_trait::async_trait;
use oneshot_core::{ActivityEvent, RecoveryResult};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;

const DEFAULT_MODEL: &str = "llama3.2";
/// Local models choke on long prompts; the engine truncates to this.
const MAX_PROMPT_LEN: usize = 8_000;

#[derive(Debug, Clone)]
pub struct DirectExecutor {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl DirectExecutor {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Construct from `OLLAMA_BASE_URL` / `OLLAMA_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(crate::env::ollama_base_url(), crate::env::ollama_api_key())
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl Executor for DirectExecutor {
    fn name(&self) -> &'static str {
        "direct"
    }

    /// The "command" for an HTTP executor is its request template.
    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());
        let body = json!({
            "model": model,
            "prompt": request.prompt,
            "stream": false,
        });
        Ok(LaunchSpec {
            argv: vec!["POST".to_string(), self.endpoint()],
            env: Vec::new(),
            stdin_payload: Some(body.to_string()),
            use_pty: false,
        })
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError> {
        let url: reqwest::Url = self
            .endpoint()
            .parse()
            .map_err(|e| ExecutorError::Endpoint(format!("{}: {}", self.endpoint(), e)))?;

        let model = request.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into());
        let prompt = request.prompt.clone();
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let endpoint = url.to_string();

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let _ = tx
                .send(StreamItem::Event(ActivityEvent::ApiRequestStarted {
                    model: model.clone(),
                    prompt_length: prompt.len(),
                    endpoint: endpoint.clone(),
                }))
                .await;

            let started = Instant::now();
            let mut builder = client.post(url).json(&json!({
                "model": model,
                "prompt": prompt,
                "stream": false,
            }));
            if let Some(key) = api_key {
                builder = builder.bearer_auth(key);
            }

            let outcome = match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    match response.json::<Value>().await {
                        Ok(body) if status.is_success() => Ok(body),
                        Ok(body) => Err(format!(
                            "HTTP {} from {}: {}",
                            status,
                            endpoint,
                            body.get("error").and_then(|v| v.as_str()).unwrap_or("")
                        )),
                        Err(e) => Err(format!("bad response body from {}: {}", endpoint, e)),
                    }
                }
                Err(e) => Err(format!("request to {} failed: {}", endpoint, e)),
            };

            match outcome {
                Ok(body) => {
                    let text = body
                        .get("response")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string();
                    let _ = tx
                        .send(StreamItem::Event(ActivityEvent::ApiResponseReceived {
                            content_length: text.len(),
                            duration_ms: started.elapsed().as_millis() as u64,
                        }))
                        .await;
                    let _ = tx
                        .send(StreamItem::Event(ActivityEvent::CompletionResult { text }))
                        .await;
                    let _ = tx
                        .send(StreamItem::Exit(ExitSummary {
                            code: Some(0),
                            stderr_tail: String::new(),
                        }))
                        .await;
                }
                Err(message) => {
                    let _ = tx
                        .send(StreamItem::Event(ActivityEvent::Error {
                            kind: "http".to_string(),
                            message: message.clone(),
                        }))
                        .await;
                    let _ = tx
                        .send(StreamItem::Exit(ExitSummary {
                            code: Some(1),
                            stderr_tail: message,
                        }))
                        .await;
                }
            }
        });

        Ok(ExecutionStream::from_channel(rx))
    }

    fn translate(&self, _value: &Value) -> Vec<ActivityEvent> {
        // Events are synthesized in execute(); nothing arrives as raw JSON.
        Vec::new()
    }

    async fn recover(&self, _oneshot_id: &str, _workdir: &Path) -> RecoveryResult {
        RecoveryResult::dead("HTTP executors are stateless")
    }

    fn max_prompt_len(&self) -> Option<usize> {
        Some(MAX_PROMPT_LEN)
    }
}

#[cfg(test)]
#[path = "direct_tests.rs"]
mod tests;
