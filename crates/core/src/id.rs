// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identifiers.
//!
//! A oneshot id is a sortable wall-clock timestamp plus a short random
//! suffix: `2026-07-01_10-42-07-9f3a`. The same id is injected verbatim
//! into the worker prompt header so agents echo it into their own task
//! storage, which is how recovery finds the right forensic trail.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Epoch milliseconds now. Saturates to 0 before the epoch.
pub fn epoch_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Stable session id, also the correlation string agents embed in their logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OneshotId(String);

impl OneshotId {
    /// Generate an id for the current instant.
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    /// Generate an id for a specific instant (deterministic prefix).
    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let stamp = at.format("%Y-%m-%d_%H-%M-%S");
        OneshotId(format!("{}-{}", stamp, short_random(4)))
    }

    pub fn new(id: impl Into<String>) -> Self {
        OneshotId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Context file name for this session: `<id>-oneshot.json`.
    pub fn context_file_name(&self) -> String {
        format!("{}-oneshot.json", self.0)
    }

    /// Activity log file name for this session: `<id>-oneshot-log.json`.
    pub fn log_file_name(&self) -> String {
        format!("{}-oneshot-log.json", self.0)
    }
}

impl fmt::Display for OneshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OneshotId {
    fn from(s: String) -> Self {
        OneshotId(s)
    }
}

impl From<&str> for OneshotId {
    fn from(s: &str) -> Self {
        OneshotId(s.to_string())
    }
}

/// Generate a short random hex string.
fn short_random(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| format!("{:x}", rng.random::<u8>() % 16))
        .collect()
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
