// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable session state for oneshot: the execution context file and the
//! NDJSON activity log.

mod activity_log;
mod context;
mod discover;
mod migration;

pub use activity_log::{last_ingress_ts, read_envelopes, ActivityLogWriter, LogError};
pub use context::{
    ContextError, ExecutionContext, SessionMetadata, StateChange, CURRENT_SCHEMA_VERSION,
};
pub use discover::{find_latest_session, resolve_resume_target};
pub use migration::{Migration, MigrationError, MigrationRegistry};
