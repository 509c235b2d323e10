// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side result artifacts and recovery outcomes

use crate::activity::ActivityEvent;
use crate::verdict::Verdict;
use serde::{Deserialize, Serialize};

/// The extractor's scored pick plus surrounding context, handed to the
/// auditor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Best candidate text from the worker's activity log
    pub result: String,
    /// Up to k envelopes of text preceding the pick
    pub leading_context: Vec<String>,
    /// Up to k envelopes of text following the pick
    pub trailing_context: Vec<String>,
    /// Score of the pick under the active weights
    pub score: i32,
}

/// What forensic analysis concluded about a dead agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictHint {
    /// The agent finished its task before dying (zombie success)
    Success,
    /// The agent made progress but did not finish
    Partial,
    /// Nothing usable was found
    Dead,
}

/// Result of executor-specific forensic recovery after a crash or
/// inactivity kill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryResult {
    pub success: bool,
    /// Events reconstructed from the agent's own on-disk state
    pub recovered_activity: Vec<ActivityEvent>,
    pub verdict_hint: VerdictHint,
    /// Human-readable description of what was found and where
    pub evidence: String,
}

impl RecoveryResult {
    pub fn dead(evidence: impl Into<String>) -> Self {
        Self {
            success: false,
            recovered_activity: Vec::new(),
            verdict_hint: VerdictHint::Dead,
            evidence: evidence.into(),
        }
    }

    pub fn found(
        hint: VerdictHint,
        recovered_activity: Vec<ActivityEvent>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            success: hint != VerdictHint::Dead,
            recovered_activity,
            verdict_hint: hint,
            evidence: evidence.into(),
        }
    }
}

/// Most recent output of one role, stored in the execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleResult {
    /// Primary text (worker: best candidate; auditor: raw output)
    pub text: String,
    /// Auditor verdict, when this is an auditor result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    /// Advice for the next worker iteration, when the verdict was RETRY
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
    /// Extractor score, when this is a worker result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    /// Epoch milliseconds when the result was recorded
    pub recorded_at_ms: i64,
}
