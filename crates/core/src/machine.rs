// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure transition logic over the session state set.
//!
//! `transition` is a total function of `(state, event)`: every pair either
//! maps to exactly one next state or rejects with [`InvalidTransition`].
//! No I/O, no side effects; the engine is the only caller.

use crate::event::StateEvent;
use crate::state::OneshotState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the engine should do next, as decided by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    RunWorker,
    RunAuditor,
    Recover,
    Wait,
    Exit,
}

/// A `(state, event)` pair outside the legal transition set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {from} + {event}")]
pub struct InvalidTransition {
    pub from: OneshotState,
    pub event: StateEvent,
}

/// Compute the next state for `(state, event)`.
///
/// Terminal states accept no events. `Interrupt` is accepted from every
/// non-terminal state.
pub fn transition(
    from: OneshotState,
    event: StateEvent,
) -> Result<OneshotState, InvalidTransition> {
    use OneshotState as S;
    use StateEvent as E;

    // Interrupt wins from any non-terminal state.
    if event == E::Interrupt && !from.is_terminal() {
        return Ok(S::Interrupted);
    }

    let next = match (from, event) {
        (S::Created, E::Start) => S::WorkerExecuting,

        (S::WorkerExecuting, E::Success) => S::AuditPending,
        (S::WorkerExecuting, E::Crash) => S::RecoveryPending,
        (S::WorkerExecuting, E::Inactivity) => S::RecoveryPending,

        (S::RecoveryPending, E::ZombieSuccess) => S::AuditPending,
        (S::RecoveryPending, E::ZombiePartial) => S::ReiterationPending,
        (S::RecoveryPending, E::ZombieDead) => S::Failed,

        (S::AuditPending, E::Next) => S::AuditorExecuting,

        (S::AuditorExecuting, E::Done) => S::Completed,
        (S::AuditorExecuting, E::Retry) => S::ReiterationPending,
        (S::AuditorExecuting, E::Impossible) => S::Rejected,
        (S::AuditorExecuting, E::Crash) => S::Failed,
        // No auditor recovery: a silent auditor is fatal.
        (S::AuditorExecuting, E::Inactivity) => S::Failed,

        (S::ReiterationPending, E::Next) => S::WorkerExecuting,
        (S::ReiterationPending, E::MaxIterations) => S::Failed,

        _ => return Err(InvalidTransition { from, event }),
    };
    Ok(next)
}

/// Deterministic next action for a state.
pub fn next_action(state: OneshotState) -> Action {
    match state {
        OneshotState::Created => Action::RunWorker,
        OneshotState::ReiterationPending => Action::RunWorker,
        OneshotState::AuditPending => Action::RunAuditor,
        OneshotState::RecoveryPending => Action::Recover,
        OneshotState::WorkerExecuting | OneshotState::AuditorExecuting => Action::Wait,
        OneshotState::Completed
        | OneshotState::Failed
        | OneshotState::Rejected
        | OneshotState::Interrupted => Action::Exit,
    }
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
