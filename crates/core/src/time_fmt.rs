// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time formatting for session summaries and state history.

use chrono::{TimeZone, Utc};

/// Format a millisecond span the way the session summary reports it.
///
/// Sessions are bounded by `max_timeout`, so days never appear. Fast
/// local-model runs finish in under a minute and get one decimal
/// ("8.5s"); anything longer breaks into zero-padded units ("4m07s",
/// "1h12m") so history columns line up.
pub fn format_span_ms(ms: u64) -> String {
    const MINUTE: u64 = 60_000;
    const HOUR: u64 = 60 * MINUTE;

    if ms < MINUTE {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else if ms < HOUR {
        format!("{}m{:02}s", ms / MINUTE, (ms % MINUTE) / 1000)
    } else {
        format!("{}h{:02}m", ms / HOUR, (ms % HOUR) / MINUTE)
    }
}

/// Format epoch milliseconds as a UTC timestamp: `2026-07-01T10:42:07Z`.
///
/// Used when printing state history lines. Out-of-range values fall back
/// to the raw number so a corrupt timestamp never panics a summary.
pub fn format_epoch_ms(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        None => format!("{}ms", ms),
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
