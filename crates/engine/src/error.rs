// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use oneshot_core::{InvalidTransition, OneshotState};
use oneshot_executors::ExecutorError;
use oneshot_storage::{ContextError, LogError};
use thiserror::Error;

/// Errors that abort the engine loop.
///
/// Stream-level problems never reach this type; they are handled inside
/// the pipeline. Agent failures travel as state-machine events, not
/// errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("context error: {0}")]
    Context(#[from] ContextError),
    #[error("activity log error: {0}")]
    Log(#[from] LogError),
    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("state machine rejected transition: {0}")]
    Machine(#[from] InvalidTransition),
    #[error("engine woke up in active state {0}, which only a run may enter")]
    LogicError(OneshotState),
}
