// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration, threaded through constructors.

use std::time::Duration;

/// Runtime knobs for one session. No globals: the CLI builds one of
/// these and hands it to the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Kill an agent after this long without any output.
    pub inactivity_timeout: Duration,
    /// Absolute wall-clock ceiling for the whole session.
    pub max_timeout: Duration,
    /// Envelopes of context on each side of the extracted result.
    pub context_window: usize,
    /// Trailing auditor envelopes used as advice when the verdict parser
    /// found no explicit advice string.
    pub advice_tail: usize,
    /// Header overrides; `None` uses the built-in correlation header.
    pub worker_prompt_header: Option<String>,
    pub auditor_prompt_header: Option<String>,
    pub reworker_prompt_header: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(300),
            max_timeout: Duration::from_secs(3600),
            context_window: 2,
            advice_tail: 3,
            worker_prompt_header: None,
            auditor_prompt_header: None,
            reworker_prompt_header: None,
        }
    }
}
