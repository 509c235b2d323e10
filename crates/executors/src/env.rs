// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment flags consumed by executors.
//!
//! Each knob has a production default; tests and headless CI override via
//! the environment rather than plumbing extra config.

use std::path::PathBuf;
use std::time::Duration;

/// `ONESHOT_NO_PTY`: globally disable PTY allocation (headless CI).
pub fn pty_disabled() -> bool {
    match std::env::var("ONESHOT_NO_PTY") {
        Ok(v) => !v.is_empty() && v != "0",
        Err(_) => false,
    }
}

/// `ONESHOT_GRACE_TIMEOUT_MS`: how long to wait between the graceful
/// signal and the force-kill. Default: 5000ms.
pub fn grace_timeout() -> Duration {
    duration_ms("ONESHOT_GRACE_TIMEOUT_MS", 5_000)
}

/// `CLAUDE_CONFIG_DIR`: Claude Code state directory. Default: `~/.claude`.
pub fn claude_config_dir() -> PathBuf {
    std::env::var("CLAUDE_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".claude"))
}

/// `CLINE_DATA_DIR`: cline task storage. Default: `~/.cline/data`.
pub fn cline_data_dir() -> PathBuf {
    std::env::var("CLINE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs::home_dir().unwrap_or_default().join(".cline/data"))
}

/// `OLLAMA_BASE_URL`: endpoint for the direct HTTP executor.
/// Default: `http://localhost:11434`.
pub fn ollama_base_url() -> String {
    std::env::var("OLLAMA_BASE_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "http://localhost:11434".to_string())
}

/// `OLLAMA_API_KEY`: optional bearer token for the direct executor.
pub fn ollama_api_key() -> Option<String> {
    std::env::var("OLLAMA_API_KEY").ok().filter(|v| !v.is_empty())
}

fn duration_ms(var: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
