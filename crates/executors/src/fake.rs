// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted executor for engine and pipeline tests.

use crate::prompt::PromptDialect;
use crate::stream::{ExecutionStream, ExitSummary, StreamItem};
use crate::{ExecutionRequest, Executor, ExecutorError, LaunchSpec};
use async_trait::async_trait;
use oneshot_core::{ActivityEvent, RecoveryResult};
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// What one scripted run does.
#[derive(Debug, Clone)]
pub enum FakeRun {
    /// Emit the events, then exit with the code.
    Emit {
        events: Vec<ActivityEvent>,
        exit_code: i32,
    },
    /// Emit the events, then go silent until the stream is shut down.
    Hang { events: Vec<ActivityEvent> },
    /// Fail at launch (missing binary).
    FailSpawn,
}

/// Scripted executor. Runs are consumed in order; the last run repeats.
#[derive(Clone)]
pub struct FakeExecutor {
    name: &'static str,
    dialect: PromptDialect,
    runs: Arc<Mutex<Vec<FakeRun>>>,
    recovery: Arc<Mutex<RecoveryResult>>,
    /// Prompts passed to execute(), in order.
    pub prompts: Arc<Mutex<Vec<String>>>,
    /// How many times recover() was invoked.
    pub recover_calls: Arc<Mutex<u32>>,
}

impl FakeExecutor {
    pub fn new(name: &'static str, runs: Vec<FakeRun>) -> Self {
        Self {
            name,
            dialect: PromptDialect::Xml,
            runs: Arc::new(Mutex::new(runs)),
            recovery: Arc::new(Mutex::new(RecoveryResult::dead("no scripted recovery"))),
            prompts: Arc::new(Mutex::new(Vec::new())),
            recover_calls: Arc::new(Mutex::new(0)),
        }
    }

    /// One run that emits a completion and exits cleanly.
    pub fn completing(name: &'static str, text: &str) -> Self {
        Self::new(
            name,
            vec![FakeRun::Emit {
                events: vec![ActivityEvent::CompletionResult { text: text.into() }],
                exit_code: 0,
            }],
        )
    }

    pub fn with_recovery(self, recovery: RecoveryResult) -> Self {
        *self.recovery.lock() = recovery;
        self
    }

    pub fn with_dialect(mut self, dialect: PromptDialect) -> Self {
        self.dialect = dialect;
        self
    }

    fn next_run(&self) -> FakeRun {
        let mut runs = self.runs.lock();
        if runs.len() > 1 {
            runs.remove(0)
        } else {
            runs.first().cloned().unwrap_or(FakeRun::Emit {
                events: Vec::new(),
                exit_code: 0,
            })
        }
    }
}

#[async_trait]
impl Executor for FakeExecutor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        Ok(LaunchSpec {
            argv: vec![self.name.to_string(), request.prompt.clone()],
            env: Vec::new(),
            stdin_payload: None,
            use_pty: false,
        })
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError> {
        self.prompts.lock().push(request.prompt.clone());

        let run = self.next_run();
        if matches!(run, FakeRun::FailSpawn) {
            return Err(ExecutorError::MissingBinary(self.name.to_string()));
        }

        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            match run {
                FakeRun::Emit { events, exit_code } => {
                    for event in events {
                        if tx.send(StreamItem::Event(event)).await.is_err() {
                            return;
                        }
                    }
                    let _ = tx
                        .send(StreamItem::Exit(ExitSummary {
                            code: Some(exit_code),
                            stderr_tail: String::new(),
                        }))
                        .await;
                }
                FakeRun::Hang { events } => {
                    for event in events {
                        if tx.send(StreamItem::Event(event)).await.is_err() {
                            return;
                        }
                    }
                    while !tx.is_closed() {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                    }
                }
                FakeRun::FailSpawn => {}
            }
        });

        Ok(ExecutionStream::from_channel(rx))
    }

    fn translate(&self, _value: &Value) -> Vec<ActivityEvent> {
        Vec::new()
    }

    async fn recover(&self, _oneshot_id: &str, _workdir: &Path) -> RecoveryResult {
        *self.recover_calls.lock() += 1;
        self.recovery.lock().clone()
    }

    fn dialect(&self) -> PromptDialect {
        self.dialect
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
