// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciling forensic recovery with the activity log.
//!
//! Recovered events are re-ingressed: they get fresh timestamps at the
//! recovery moment, which keeps the log's line order equal to ingress
//! order. Events the pipeline already logged before the agent died are
//! skipped so a half-streamed result does not appear twice.

use oneshot_core::{
    epoch_ms_now, ActivityEnvelope, ActivityEvent, ExecutorRole, RecoveryResult, StateEvent,
    VerdictHint,
};
use oneshot_storage::ActivityLogWriter;

/// Append recovered activity to the log and map the verdict hint to its
/// state-machine event.
///
/// Returns the event plus how many envelopes were actually appended.
pub fn reconcile_recovery(
    recovery: &RecoveryResult,
    existing: &[ActivityEnvelope],
    oneshot_id: &str,
    log: &mut ActivityLogWriter,
) -> (StateEvent, usize) {
    let last_ts = existing.iter().map(|e| e.ts_ms).max().unwrap_or(0);
    let mut appended = 0usize;

    for event in &recovery.recovered_activity {
        if already_logged(event, existing) {
            continue;
        }
        // Ingress-timestamped to the recovery moment, never before the
        // last logged line.
        let ts_ms = epoch_ms_now().max(last_ts);
        let envelope = ActivityEnvelope::new(ts_ms, ExecutorRole::Worker, oneshot_id, event.clone());
        if let Err(e) = log.append(&envelope) {
            tracing::warn!(error = %e, "failed to append recovered envelope");
            continue;
        }
        appended += 1;
    }

    let event = match recovery.verdict_hint {
        VerdictHint::Success => StateEvent::ZombieSuccess,
        VerdictHint::Partial => StateEvent::ZombiePartial,
        VerdictHint::Dead => StateEvent::ZombieDead,
    };
    (event, appended)
}

/// A recovered event is a duplicate when an existing worker envelope
/// already carries the same text.
fn already_logged(event: &ActivityEvent, existing: &[ActivityEnvelope]) -> bool {
    let text = event.full_text();
    if text.trim().is_empty() {
        return false;
    }
    existing
        .iter()
        .filter(|e| e.executor == ExecutorRole::Worker)
        .any(|e| e.full_text() == text)
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
