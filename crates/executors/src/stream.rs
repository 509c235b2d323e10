// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The scoped item stream an executor hands to the pipeline.
//!
//! Items arrive as soon as the underlying I/O yields them; the sequence
//! is finite and not restartable. Shutting the stream down terminates the
//! agent (graceful signal, then force-kill after a bounded grace) so an
//! inactivity- or user-driven abort cannot leak processes.

use crate::subprocess::ChildHandle;
use oneshot_core::ActivityEvent;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

/// Exit report, the final item of a subprocess stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitSummary {
    pub code: Option<i32>,
    /// Trailing stderr, for crash reasons (empty under a PTY, where the
    /// streams are merged)
    pub stderr_tail: String,
}

/// One raw item from an agent.
#[derive(Debug)]
pub enum StreamItem {
    /// Raw stdout bytes (subprocess executors)
    Bytes(Vec<u8>),
    /// An already-parsed native object (executors that pre-parse)
    Json(Value),
    /// An already-unified event (HTTP executors synthesize these)
    Event(ActivityEvent),
    /// Process exit; always the last item of a subprocess stream
    Exit(ExitSummary),
}

/// Lazy, single-consumer item sequence with process ownership.
#[derive(Debug)]
pub struct ExecutionStream {
    rx: mpsc::Receiver<StreamItem>,
    child: Option<ChildHandle>,
    grace: Duration,
}

impl ExecutionStream {
    /// Stream backed by a subprocess.
    pub fn from_child(rx: mpsc::Receiver<StreamItem>, child: ChildHandle) -> Self {
        Self {
            rx,
            child: Some(child),
            grace: crate::env::grace_timeout(),
        }
    }

    /// Stream backed by a task only (HTTP and fake executors).
    pub fn from_channel(rx: mpsc::Receiver<StreamItem>) -> Self {
        Self {
            rx,
            child: None,
            grace: crate::env::grace_timeout(),
        }
    }

    /// Pull the next item; `None` after the stream is exhausted.
    pub async fn next(&mut self) -> Option<StreamItem> {
        self.rx.recv().await
    }

    /// Pid of the agent process, when there is one.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|c| c.pid())
    }

    /// Terminate the agent: graceful signal, bounded grace, force-kill.
    ///
    /// Idempotent; double-shutdown is a no-op. Also drains the channel so
    /// producer tasks finish promptly.
    pub async fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            child.terminate(self.grace).await;
        }
        self.rx.close();
    }
}

impl Drop for ExecutionStream {
    fn drop(&mut self) {
        // Scope exit without an explicit shutdown still may not leak the
        // process: force-kill without the grace period.
        if let Some(mut child) = self.child.take() {
            child.force_kill();
        }
    }
}
