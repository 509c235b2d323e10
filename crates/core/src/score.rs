// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Candidate scoring for result extraction.
//!
//! The numeric weights are tunable; only their monotonic relationships are
//! load-bearing. A candidate containing `DONE` and valid JSON must beat
//! one that is merely long, so the signal weights dominate the length cap.

use serde::{Deserialize, Serialize};

/// Bonus for a `DONE` token in the candidate text.
pub const W_DONE: i32 = 400;
/// Bonus for candidate text that parses as a JSON object or array.
pub const W_JSON: i32 = 250;
/// Bonus for a `status` field inside parsed JSON.
pub const W_STATUS: i32 = 150;
/// Bonus for a `result` field inside parsed JSON.
pub const W_RESULT: i32 = 150;
/// Bonus for a completion_result envelope (the executor said "this is it").
pub const W_COMPLETION: i32 = 300;
/// Length contribution cap: one point per 10 chars, at most this much.
pub const W_LENGTH_CAP: i32 = 100;

/// Scoring weights, defaulting to the constants above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub done_token: i32,
    pub valid_json: i32,
    pub status_field: i32,
    pub result_field: i32,
    pub completion_event: i32,
    pub length_cap: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            done_token: W_DONE,
            valid_json: W_JSON,
            status_field: W_STATUS,
            result_field: W_RESULT,
            completion_event: W_COMPLETION,
            length_cap: W_LENGTH_CAP,
        }
    }
}

impl ScoreWeights {
    /// Score one candidate text.
    ///
    /// `is_completion` marks text that arrived as a `completion_result`
    /// event rather than ordinary output.
    pub fn score(&self, text: &str, is_completion: bool) -> i32 {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return 0;
        }

        let mut score = 0;

        if has_done_token(trimmed) {
            score += self.done_token;
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if value.is_object() || value.is_array() {
                score += self.valid_json;
                if value.get("status").is_some() {
                    score += self.status_field;
                }
                if value.get("result").is_some() {
                    score += self.result_field;
                }
            }
        }

        if is_completion {
            score += self.completion_event;
        }

        score += ((trimmed.len() / 10) as i32).min(self.length_cap);

        score
    }
}

/// `DONE` as a standalone uppercase token.
fn has_done_token(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut from = 0;
    while let Some(pos) = text[from..].find("DONE") {
        let start = from + pos;
        let end = start + 4;
        let left_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let right_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if left_ok && right_ok {
            return true;
        }
        from = end;
    }
    false
}

#[cfg(test)]
#[path = "score_tests.rs"]
mod tests;
