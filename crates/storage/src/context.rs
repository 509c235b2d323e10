// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The durable session object, serialized to `<id>-oneshot.json`.
//!
//! The engine is the only writer. Every successful state transition is
//! followed by a save before the engine proceeds, and saves are atomic:
//! a reader never observes a partial file, only the previous or the new
//! value.

use crate::migration::MigrationRegistry;
use chrono::{DateTime, Utc};
use oneshot_core::{epoch_ms_now, OneshotId, OneshotState, RoleResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current context schema version. Bump when adding fields that old
/// readers must not silently drop.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Errors from context persistence.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("no session file at {0}")]
    NotFound(PathBuf),
    #[error("context file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("context schema v{found} is newer than supported v{supported}")]
    TooNew { found: u32, supported: u32 },
    #[error("migration failed: {0}")]
    Migration(#[from] crate::migration::MigrationError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session configuration recorded at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Original task prompt text
    pub prompt: String,
    pub worker_executor: String,
    pub auditor_executor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditor_model: Option<String>,
    /// Working directory agents run in
    pub workdir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_prompt_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditor_prompt_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reworker_prompt_header: Option<String>,
    /// HEAD SHA captured after code-writing worker runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    /// Provider-level settings (endpoint overrides, etc.)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provider_settings: BTreeMap<String, String>,
}

/// One entry of the session's state history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub state: OneshotState,
    pub timestamp_ms: i64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// The durable session object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub schema_version: u32,
    pub oneshot_id: OneshotId,
    pub state: OneshotState,
    pub iteration_count: u32,
    pub max_iterations: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: SessionMetadata,
    /// Arbitrary user-visible key/value map
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_result: Option<RoleResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auditor_result: Option<RoleResult>,
    #[serde(default)]
    pub state_history: Vec<StateChange>,
    pub session_log_path: PathBuf,

    /// Where this context is persisted. Set at creation/load, never
    /// serialized.
    #[serde(skip)]
    path: PathBuf,
}

impl ExecutionContext {
    /// Create a fresh context in `CREATED` state, persisted at `path`.
    pub fn create(
        path: PathBuf,
        oneshot_id: OneshotId,
        metadata: SessionMetadata,
        max_iterations: u32,
        session_log_path: PathBuf,
    ) -> Self {
        let now = Utc::now();
        let mut ctx = Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            oneshot_id,
            state: OneshotState::Created,
            iteration_count: 0,
            max_iterations,
            created_at: now,
            updated_at: now,
            metadata,
            variables: BTreeMap::new(),
            worker_result: None,
            auditor_result: None,
            state_history: Vec::new(),
            session_log_path,
            path,
        };
        ctx.push_history(OneshotState::Created, "session created", None);
        ctx
    }

    /// Load a context from disk, migrating older schema versions.
    ///
    /// A missing file is [`ContextError::NotFound`]; an unparseable file is
    /// [`ContextError::Corrupt`]; callers must not overwrite a corrupt
    /// session.
    pub fn load(path: &Path) -> Result<Self, ContextError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ContextError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(ContextError::Io(e)),
        };

        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(|source| ContextError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let found = value
            .get("schema_version")
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as u32;
        if found > CURRENT_SCHEMA_VERSION {
            return Err(ContextError::TooNew {
                found,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }

        let migrated = MigrationRegistry::new().migrate_to(value, CURRENT_SCHEMA_VERSION)?;
        let mut ctx: ExecutionContext =
            serde_json::from_value(migrated).map_err(|source| ContextError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;
        ctx.schema_version = CURRENT_SCHEMA_VERSION;
        ctx.path = path.to_path_buf();
        Ok(ctx)
    }

    /// Atomically persist the context.
    ///
    /// Writes a sibling temp file, fsyncs it, renames over the target, and
    /// fsyncs the directory so the rename survives a crash.
    pub fn save(&self) -> Result<(), ContextError> {
        let body = serde_json::to_vec_pretty(self).map_err(|source| ContextError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;

        let tmp_name = format!(
            ".{}.tmp-{}",
            self.path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("oneshot"),
            std::process::id(),
        );
        let tmp_path = parent.join(tmp_name);

        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&tmp_path)?;
            file.write_all(&body)?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &self.path)?;
        sync_dir(&parent);
        Ok(())
    }

    /// Record a state transition. The caller saves afterwards.
    pub fn set_state(&mut self, state: OneshotState, reason: impl Into<String>, pid: Option<u32>) {
        self.state = state;
        self.updated_at = Utc::now();
        self.push_history(state, reason, pid);
    }

    pub fn increment_iteration(&mut self) {
        self.iteration_count += 1;
        self.updated_at = Utc::now();
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    pub fn set_worker_result(&mut self, result: RoleResult) {
        self.worker_result = Some(result);
        self.updated_at = Utc::now();
    }

    pub fn set_auditor_result(&mut self, result: RoleResult) {
        self.auditor_result = Some(result);
        self.updated_at = Utc::now();
    }

    /// Path of the persisted context file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reason recorded with the most recent state change, if any.
    pub fn last_reason(&self) -> Option<&str> {
        self.state_history.last().map(|c| c.reason.as_str())
    }

    /// The most recent state before the trailing run of `Interrupted`
    /// entries. Used by resume to decide where to pick up.
    pub fn last_state_before_interrupt(&self) -> Option<OneshotState> {
        self.state_history
            .iter()
            .rev()
            .map(|c| c.state)
            .find(|s| *s != OneshotState::Interrupted)
    }

    fn push_history(&mut self, state: OneshotState, reason: impl Into<String>, pid: Option<u32>) {
        self.state_history.push(StateChange {
            state,
            timestamp_ms: epoch_ms_now(),
            reason: reason.into(),
            pid,
        });
    }
}

/// Fsync a directory so a rename inside it is durable. Failure is logged,
/// not fatal; the rename itself already happened.
fn sync_dir(path: &Path) {
    #[cfg(unix)]
    if let Err(e) = std::fs::File::open(path).and_then(|d| d.sync_all()) {
        tracing::warn!(path = %path.display(), error = %e, "failed to fsync context directory");
    }
    #[cfg(not(unix))]
    let _ = path;
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
