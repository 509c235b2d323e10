// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal session summary.

use oneshot_core::{format_epoch_ms, format_span_ms, OneshotState};
use oneshot_storage::ExecutionContext;

/// Render the end-of-session report.
///
/// Assembled from the recorded state history so the reasons shown are
/// exactly what was persisted.
pub fn render_summary(ctx: &ExecutionContext, log_deleted: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!("session:    {}\n", ctx.oneshot_id));
    out.push_str(&format!("state:      {}\n", ctx.state));
    if let Some(reason) = ctx.last_reason() {
        if !reason.is_empty() {
            out.push_str(&format!("reason:     {}\n", reason));
        }
    }
    out.push_str(&format!(
        "iterations: {}/{}\n",
        ctx.iteration_count, ctx.max_iterations
    ));

    if let (Some(first), Some(last)) = (ctx.state_history.first(), ctx.state_history.last()) {
        let elapsed_ms = last.timestamp_ms.saturating_sub(first.timestamp_ms);
        out.push_str(&format!(
            "elapsed:    {}\n",
            format_span_ms(elapsed_ms as u64)
        ));
    }

    if let Some(result) = &ctx.worker_result {
        let text = result.text.trim();
        if !text.is_empty() {
            out.push_str("\nresult:\n");
            for line in text.lines().take(10) {
                out.push_str(&format!("  {}\n", line));
            }
        }
    }

    out.push_str(&format!("\ncontext:    {}\n", ctx.path().display()));
    if log_deleted {
        out.push_str("log:        (deleted after success; pass --keep-log to retain)\n");
    } else {
        out.push_str(&format!("log:        {}\n", ctx.session_log_path.display()));
    }

    out.push_str("\nhistory:\n");
    for change in &ctx.state_history {
        out.push_str(&format!(
            "  {} {:<20} {}\n",
            format_epoch_ms(change.timestamp_ms),
            change.state.to_string(),
            change.reason
        ));
    }

    if ctx.state == OneshotState::Interrupted {
        out.push_str(&format!(
            "\ninterrupted — resume with: oneshot --resume {}\n",
            ctx.oneshot_id
        ));
    }

    out
}

#[cfg(test)]
#[path = "summary_tests.rs"]
mod tests;
