// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! NDJSON activity log: one envelope per line, every line independently
//! parseable.
//!
//! The writer validates and flushes each line before the pipeline yields
//! the envelope downstream, so the file's line order equals ingress order
//! and a truncation at any line boundary loses nothing earlier. Malformed
//! envelopes are discarded with a warning; logging must not break the
//! engine.

use oneshot_core::ActivityEnvelope;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from activity log I/O.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Append-only NDJSON writer with lazy file creation.
///
/// The file is created on the first append, so sessions that die before
/// producing any activity leave no empty log behind.
pub struct ActivityLogWriter {
    path: PathBuf,
    file: Option<File>,
    lines_written: u64,
    discarded: u64,
}

impl ActivityLogWriter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file: None,
            lines_written: 0,
            discarded: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Append one envelope as a single NDJSON line, flushing before
    /// returning.
    ///
    /// Heartbeats are never persisted. An envelope that fails to
    /// serialize to a single line is discarded with a warning and `Ok` is
    /// returned; only real I/O failures propagate.
    pub fn append(&mut self, envelope: &ActivityEnvelope) -> Result<(), LogError> {
        if envelope.is_heartbeat {
            return Ok(());
        }

        let line = match serde_json::to_string(envelope) {
            Ok(line) if !line.contains('\n') => line,
            Ok(_) => {
                self.discarded += 1;
                tracing::warn!(path = %self.path.display(), "discarding multi-line envelope");
                return Ok(());
            }
            Err(e) => {
                self.discarded += 1;
                tracing::warn!(path = %self.path.display(), error = %e, "discarding unserializable envelope");
                return Ok(());
            }
        };

        let file = self.open()?;
        writeln!(file, "{}", line)?;
        file.flush()?;
        self.lines_written += 1;
        Ok(())
    }

    /// Delete the log file if nothing was ever written to it.
    ///
    /// Covers logs created by an earlier run of the same session (resume)
    /// as well as the lazy-creation case.
    pub fn cleanup_if_empty(&mut self) {
        self.file = None;
        let is_empty = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(false);
        if is_empty {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove empty log");
            }
        }
    }

    fn open(&mut self) -> Result<&mut File, LogError> {
        if self.file.is_none() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.file = Some(file);
        }
        // The branch above just filled the option.
        match self.file.as_mut() {
            Some(file) => Ok(file),
            None => Err(LogError::Io(std::io::Error::other("log file not open"))),
        }
    }
}

/// Read all valid envelopes from a log file, skipping malformed lines
/// with a warning. A missing file reads as empty.
pub fn read_envelopes(path: &Path) -> Vec<ActivityEnvelope> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return Vec::new(),
    };

    let mut envelopes = Vec::new();
    let mut skipped = 0u64;
    for line in BufReader::new(file).lines() {
        let Ok(line) = line else { break };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<ActivityEnvelope>(trimmed) {
            Ok(envelope) => envelopes.push(envelope),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "skipped malformed activity log lines");
    }
    envelopes
}

/// Ingress timestamp of the last valid line, if any.
pub fn last_ingress_ts(path: &Path) -> Option<i64> {
    read_envelopes(path).last().map(|e| e.ts_ms)
}

#[cfg(test)]
#[path = "activity_log_tests.rs"]
mod tests;
