// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result extraction: pick the worker's best candidate output from a
//! noisy activity log.

use oneshot_core::{ActivityEnvelope, ExecutorRole, ResultSummary, ScoreWeights};

/// Score the worker envelopes and pick the best candidate, with up to
/// `context_window` envelopes of context on each side.
///
/// `since_ts` restricts the scan to one run (envelopes at or after the
/// run's start). Ties break by recency. Returns `None` when no worker
/// envelope carries any text; the engine treats that as a worker-side
/// failure.
pub fn extract_result(
    envelopes: &[ActivityEnvelope],
    weights: &ScoreWeights,
    context_window: usize,
    since_ts: i64,
) -> Option<ResultSummary> {
    let candidates: Vec<&ActivityEnvelope> = envelopes
        .iter()
        .filter(|e| !e.is_heartbeat)
        .filter(|e| e.executor == ExecutorRole::Worker)
        .filter(|e| e.ts_ms >= since_ts)
        .collect();

    let mut best: Option<(usize, i32)> = None;
    for (index, envelope) in candidates.iter().enumerate() {
        let text = envelope.full_text();
        if text.trim().is_empty() {
            continue;
        }
        let score = weights.score(&text, envelope.data.is_completion());
        // >= so that ties go to the more recent candidate
        if best.map(|(_, s)| score >= s).unwrap_or(true) {
            best = Some((index, score));
        }
    }

    let (index, score) = best?;

    let leading_context = candidates[index.saturating_sub(context_window)..index]
        .iter()
        .map(|e| e.full_text())
        .collect();
    let trailing_context = candidates[(index + 1).min(candidates.len())..]
        .iter()
        .take(context_window)
        .map(|e| e.full_text())
        .collect();

    Some(ResultSummary {
        result: candidates[index].full_text(),
        leading_context,
        trailing_context,
        score,
    })
}

#[cfg(test)]
#[path = "extractor_tests.rs"]
mod tests;
