// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The streaming activity pipeline.
//!
//! One pump per agent run: pull raw items from the execution stream,
//! extract JSON objects from byte chunks, translate to unified events,
//! wrap in ingress-timestamped envelopes, append to the NDJSON log, and
//! emit to the UI. A cooperative watchdog raises inactivity when the
//! stream goes quiet and injects heartbeat envelopes (UI only) while
//! waiting.
//!
//! Ordering guarantee: the sequence of non-heartbeat envelopes reaching
//! the UI equals the sequence of lines appended to the log.

use crate::UiSender;
use oneshot_core::{epoch_ms_now, ActivityEnvelope, ActivityEvent, ExecutorRole};
use oneshot_executors::json_extract::{Extracted, JsonExtractor};
use oneshot_executors::{ansi, Executor, ExecutionStream, StreamItem};
use oneshot_storage::ActivityLogWriter;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Watchdog granularity.
const TICK: Duration = Duration::from_secs(1);

/// Per-run pipeline parameters.
pub struct PipelineParams {
    pub role: ExecutorRole,
    pub oneshot_id: String,
    pub inactivity_timeout: Duration,
    /// Absolute wall-clock ceiling for the session.
    pub deadline: Option<Instant>,
    pub cancel: CancellationToken,
    /// Keep the last N envelopes in the outcome (used for auditor text).
    pub collect_tail: usize,
}

/// How a pump ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PumpEnd {
    /// The agent exited on its own.
    Exited {
        code: Option<i32>,
        stderr_tail: String,
    },
    /// The watchdog killed a quiet agent.
    Inactive,
    /// The absolute ceiling was hit.
    DeadlineExceeded,
    /// The shared cancellation fired (user signal).
    Cancelled,
}

/// Result of one pump.
#[derive(Debug)]
pub struct PumpOutcome {
    pub end: PumpEnd,
    /// Non-heartbeat envelopes emitted (== log lines appended).
    pub emitted: u64,
    /// Trailing envelopes, newest last (size = `collect_tail`).
    pub tail: Vec<ActivityEnvelope>,
}

/// Pump one agent run to completion, inactivity, deadline, or cancel.
///
/// Always shuts the stream down before returning, so the agent process
/// is reaped on every path.
pub async fn pump<E: Executor>(
    executor: &E,
    stream: &mut ExecutionStream,
    params: &PipelineParams,
    log: &mut ActivityLogWriter,
    ui: Option<&UiSender>,
) -> PumpOutcome {
    let mut extractor = JsonExtractor::new();
    let mut tail: VecDeque<ActivityEnvelope> = VecDeque::new();
    let mut emitted: u64 = 0;
    let mut exit: Option<(Option<i32>, String)> = None;
    let mut last_activity = Instant::now();

    let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let end = loop {
        tokio::select! {
            biased;

            _ = params.cancel.cancelled() => {
                stream.shutdown().await;
                break PumpEnd::Cancelled;
            }

            item = stream.next() => match item {
                None => {
                    for extracted in extractor.finish() {
                        emit_extracted(executor, extracted, params, log, ui, &mut tail, &mut emitted).await;
                    }
                    let (code, stderr_tail) = exit.take().unwrap_or((None, String::new()));
                    break PumpEnd::Exited { code, stderr_tail };
                }
                Some(StreamItem::Bytes(bytes)) => {
                    last_activity = Instant::now();
                    for extracted in extractor.push(&bytes) {
                        emit_extracted(executor, extracted, params, log, ui, &mut tail, &mut emitted).await;
                    }
                }
                Some(StreamItem::Json(value)) => {
                    last_activity = Instant::now();
                    for event in executor.translate(&value) {
                        emit_event(event, params, log, ui, &mut tail, &mut emitted).await;
                    }
                }
                Some(StreamItem::Event(event)) => {
                    last_activity = Instant::now();
                    emit_event(event, params, log, ui, &mut tail, &mut emitted).await;
                }
                Some(StreamItem::Exit(summary)) => {
                    // Remember it; the channel closes right after.
                    exit = Some((summary.code, summary.stderr_tail));
                }
            },

            _ = ticker.tick() => {
                if let Some(deadline) = params.deadline {
                    if Instant::now() >= deadline {
                        stream.shutdown().await;
                        break PumpEnd::DeadlineExceeded;
                    }
                }
                if last_activity.elapsed() >= params.inactivity_timeout {
                    stream.shutdown().await;
                    break PumpEnd::Inactive;
                }
                // Liveness for downstream consumers; never persisted.
                if let Some(ui) = ui {
                    let heartbeat = ActivityEnvelope::heartbeat(
                        epoch_ms_now(),
                        params.role,
                        &params.oneshot_id,
                    );
                    let _ = ui.send(heartbeat).await;
                }
            }
        }
    };

    PumpOutcome {
        end,
        emitted,
        tail: tail.into_iter().collect(),
    }
}

async fn emit_extracted<E: Executor>(
    executor: &E,
    extracted: Extracted,
    params: &PipelineParams,
    log: &mut ActivityLogWriter,
    ui: Option<&UiSender>,
    tail: &mut VecDeque<ActivityEnvelope>,
    emitted: &mut u64,
) {
    match extracted {
        Extracted::Object(value) => {
            for event in executor.translate(&value) {
                emit_event(event, params, log, ui, tail, emitted).await;
            }
        }
        Extracted::Text(text) => {
            let clean = ansi::strip_ansi(&text);
            if clean.trim().is_empty() {
                return;
            }
            emit_event(
                ActivityEvent::Preamble { text: clean },
                params,
                log,
                ui,
                tail,
                emitted,
            )
            .await;
        }
    }
}

/// Envelope, log, then emit, in that order, so the log is never behind
/// what a UI has shown.
async fn emit_event(
    event: ActivityEvent,
    params: &PipelineParams,
    log: &mut ActivityLogWriter,
    ui: Option<&UiSender>,
    tail: &mut VecDeque<ActivityEnvelope>,
    emitted: &mut u64,
) {
    let envelope = ActivityEnvelope::new(epoch_ms_now(), params.role, &params.oneshot_id, event);

    if let Err(e) = log.append(&envelope) {
        tracing::warn!(error = %e, "failed to append activity log line");
    }
    *emitted += 1;

    if params.collect_tail > 0 {
        tail.push_back(envelope.clone());
        while tail.len() > params.collect_tail {
            tail.pop_front();
        }
    }

    if let Some(ui) = ui {
        let _ = ui.send(envelope).await;
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
