// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Executor adapters for oneshot.
//!
//! An executor represents one way to run an agent: a streaming subprocess
//! (cline, claude, gemini, aider) or an HTTP call (Ollama-style). The
//! trait covers command construction, streaming execution, native-output
//! translation into unified activity events, and forensic recovery from
//! the agent's own on-disk state after a crash.

pub mod aider;
pub mod ansi;
pub mod claude;
pub mod cline;
pub mod direct;
pub mod env;
pub mod gemini;
pub mod json_extract;
pub mod prompt;
pub mod stream;
pub mod subprocess;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExecutor;

pub use aider::AiderExecutor;
pub use claude::ClaudeExecutor;
pub use cline::ClineExecutor;
pub use direct::DirectExecutor;
pub use gemini::GeminiExecutor;
pub use prompt::{PromptDialect, PromptInput, PromptRole};
pub use stream::{ExecutionStream, ExitSummary, StreamItem};

use async_trait::async_trait;
use oneshot_core::{ActivityEvent, RecoveryResult};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from executor operations.
///
/// Launch-time errors (missing binary, bad endpoint) surface before any
/// state transition; stream-level problems are handled inside the
/// pipeline and never reach here.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("unknown executor: {0}")]
    UnknownExecutor(String),
    #[error("agent binary not found: {0}")]
    MissingBinary(String),
    #[error("spawn failed: {0}")]
    SpawnFailed(String),
    #[error("bad endpoint: {0}")]
    Endpoint(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One agent invocation.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    /// Fully formatted prompt (header + sections, see [`prompt`])
    pub prompt: String,
    pub model: Option<String>,
    /// Directory the agent runs in
    pub workdir: PathBuf,
}

/// Launch recipe produced by `build_command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub argv: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Payload written to stdin after spawn (pipe mode only)
    pub stdin_payload: Option<String>,
    /// Whether the CLI needs a PTY to stay line-buffered
    pub use_pty: bool,
}

/// Adapter for one way of running an agent.
///
/// `execute` yields a scoped stream: the subprocess starts on entry and
/// is terminated (graceful signal, then force-kill after a bounded grace)
/// when the stream is shut down or dropped, so aborts cannot leak
/// processes.
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build the launch recipe for a prompt without spawning anything.
    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError>;

    /// Start the agent and return its item stream.
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError>;

    /// Translate one native JSON object into unified events.
    ///
    /// Objects that carry no activity (init banners, usage records)
    /// translate to an empty vec.
    fn translate(&self, value: &serde_json::Value) -> Vec<ActivityEvent>;

    /// Forensic recovery from the agent's own on-disk state after a crash
    /// or inactivity kill.
    async fn recover(&self, oneshot_id: &str, workdir: &Path) -> RecoveryResult;

    /// Whether session metadata should record the HEAD SHA after runs.
    fn should_capture_git_commit(&self) -> bool {
        false
    }

    /// Prompt dialect for this executor's own invocations.
    fn dialect(&self) -> PromptDialect {
        PromptDialect::Xml
    }

    /// Role preamble prepended by the prompt formatter.
    fn system_instructions(&self, role: PromptRole) -> String {
        prompt::default_system_instructions(role)
    }

    /// Maximum prompt length this executor accepts, if bounded.
    fn max_prompt_len(&self) -> Option<usize> {
        None
    }
}

/// The concrete executor set, constructed by name.
///
/// A sum type rather than trait objects: the set is closed and the engine
/// stays generic over [`Executor`] for tests.
#[derive(Debug)]
pub enum AgentExecutor {
    Cline(ClineExecutor),
    Claude(ClaudeExecutor),
    Gemini(GeminiExecutor),
    Aider(AiderExecutor),
    Direct(DirectExecutor),
}

impl AgentExecutor {
    /// Look up an executor by CLI name.
    pub fn from_name(name: &str) -> Result<Self, ExecutorError> {
        match name {
            "cline" => Ok(AgentExecutor::Cline(ClineExecutor::new())),
            "claude" => Ok(AgentExecutor::Claude(ClaudeExecutor::new())),
            "gemini" => Ok(AgentExecutor::Gemini(GeminiExecutor::new())),
            "aider" => Ok(AgentExecutor::Aider(AiderExecutor::new())),
            "direct" | "ollama" => Ok(AgentExecutor::Direct(DirectExecutor::from_env())),
            other => Err(ExecutorError::UnknownExecutor(other.to_string())),
        }
    }

    /// Names accepted by [`AgentExecutor::from_name`].
    pub fn known_names() -> &'static [&'static str] {
        &["cline", "claude", "gemini", "aider", "direct"]
    }

    fn inner(&self) -> &dyn Executor {
        match self {
            AgentExecutor::Cline(e) => e,
            AgentExecutor::Claude(e) => e,
            AgentExecutor::Gemini(e) => e,
            AgentExecutor::Aider(e) => e,
            AgentExecutor::Direct(e) => e,
        }
    }
}

#[async_trait]
impl Executor for AgentExecutor {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn build_command(&self, request: &ExecutionRequest) -> Result<LaunchSpec, ExecutorError> {
        self.inner().build_command(request)
    }

    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionStream, ExecutorError> {
        self.inner().execute(request).await
    }

    fn translate(&self, value: &serde_json::Value) -> Vec<ActivityEvent> {
        self.inner().translate(value)
    }

    async fn recover(&self, oneshot_id: &str, workdir: &Path) -> RecoveryResult {
        self.inner().recover(oneshot_id, workdir).await
    }

    fn should_capture_git_commit(&self) -> bool {
        self.inner().should_capture_git_commit()
    }

    fn dialect(&self) -> PromptDialect {
        self.inner().dialect()
    }

    fn system_instructions(&self, role: PromptRole) -> String {
        self.inner().system_instructions(role)
    }

    fn max_prompt_len(&self) -> Option<usize> {
        self.inner().max_prompt_len()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
