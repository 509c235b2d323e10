// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events that drive session state transitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Events the engine feeds to the state machine.
///
/// Every event is producible by the engine; the state machine itself
/// produces nothing but the next state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateEvent {
    /// Begin the first worker run
    Start,
    /// Worker run produced usable output and exited cleanly
    Success,
    /// Agent exited non-zero or the executor failed
    Crash,
    /// No activity for longer than the inactivity timeout
    Inactivity,
    /// Auditor verdict: task accepted
    Done,
    /// Auditor verdict: retry with advice
    Retry,
    /// Auditor verdict: task impossible
    Impossible,
    /// Recovery found a completed result from a dead worker
    ZombieSuccess,
    /// Recovery found partial progress from a dead worker
    ZombiePartial,
    /// Recovery found nothing usable
    ZombieDead,
    /// Reiteration would exceed the iteration budget
    MaxIterations,
    /// Advance from a checkpoint to the next agent run
    Next,
    /// User interruption (signal)
    Interrupt,
}

impl StateEvent {
    /// Every event, for exhaustive table tests.
    pub fn all() -> [StateEvent; 13] {
        [
            StateEvent::Start,
            StateEvent::Success,
            StateEvent::Crash,
            StateEvent::Inactivity,
            StateEvent::Done,
            StateEvent::Retry,
            StateEvent::Impossible,
            StateEvent::ZombieSuccess,
            StateEvent::ZombiePartial,
            StateEvent::ZombieDead,
            StateEvent::MaxIterations,
            StateEvent::Next,
            StateEvent::Interrupt,
        ]
    }
}

impl fmt::Display for StateEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateEvent::Start => "start",
            StateEvent::Success => "success",
            StateEvent::Crash => "crash",
            StateEvent::Inactivity => "inactivity",
            StateEvent::Done => "done",
            StateEvent::Retry => "retry",
            StateEvent::Impossible => "impossible",
            StateEvent::ZombieSuccess => "zombie_success",
            StateEvent::ZombiePartial => "zombie_partial",
            StateEvent::ZombieDead => "zombie_dead",
            StateEvent::MaxIterations => "max_iterations",
            StateEvent::Next => "next",
            StateEvent::Interrupt => "interrupt",
        };
        write!(f, "{}", s)
    }
}
