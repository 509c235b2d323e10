// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session states for the oneshot loop

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a oneshot session.
///
/// Serialized as SCREAMING_SNAKE strings so the context file reads the same
/// way the states are discussed ("WORKER_EXECUTING", not "workerExecuting").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OneshotState {
    /// Session created, worker not yet started
    Created,
    /// Worker agent is running
    WorkerExecuting,
    /// Worker finished, audit not yet run
    AuditPending,
    /// Auditor agent is running
    AuditorExecuting,
    /// Audit said retry; next worker run pending
    ReiterationPending,
    /// Worker died or timed out; forensic analysis required
    RecoveryPending,
    /// Auditor accepted the result
    Completed,
    /// Unrecoverable failure or iteration budget exhausted
    Failed,
    /// Auditor declared the task impossible
    Rejected,
    /// User interrupted the session
    Interrupted,
}

impl OneshotState {
    /// Terminal states accept no further events.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OneshotState::Completed
                | OneshotState::Failed
                | OneshotState::Rejected
                | OneshotState::Interrupted
        )
    }

    /// States in which an agent subprocess is running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            OneshotState::WorkerExecuting | OneshotState::AuditorExecuting
        )
    }

    /// Checkpoint states: no agent running, loop decides the next action.
    pub fn is_checkpoint(&self) -> bool {
        !self.is_terminal() && !self.is_active()
    }

    /// Every state, for exhaustive table tests.
    pub fn all() -> [OneshotState; 10] {
        [
            OneshotState::Created,
            OneshotState::WorkerExecuting,
            OneshotState::AuditPending,
            OneshotState::AuditorExecuting,
            OneshotState::ReiterationPending,
            OneshotState::RecoveryPending,
            OneshotState::Completed,
            OneshotState::Failed,
            OneshotState::Rejected,
            OneshotState::Interrupted,
        ]
    }
}

impl fmt::Display for OneshotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OneshotState::Created => "CREATED",
            OneshotState::WorkerExecuting => "WORKER_EXECUTING",
            OneshotState::AuditPending => "AUDIT_PENDING",
            OneshotState::AuditorExecuting => "AUDITOR_EXECUTING",
            OneshotState::ReiterationPending => "REITERATION_PENDING",
            OneshotState::RecoveryPending => "RECOVERY_PENDING",
            OneshotState::Completed => "COMPLETED",
            OneshotState::Failed => "FAILED",
            OneshotState::Rejected => "REJECTED",
            OneshotState::Interrupted => "INTERRUPTED",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
