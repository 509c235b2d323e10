//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL: a temp session directory, stub agent scripts on
//! PATH, and assertions over exit codes and persisted files.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Fast kill grace so watchdog paths don't slow the suite down.
const GRACE_TIMEOUT_MS: &str = "200";

/// Stub worker output: one assistant message and a final result record.
pub const WORKER_STREAM: &str = r#"{"type":"assistant","message":{"content":[{"type":"text","text":"writing hello.py"}]}}
{"type":"result","subtype":"success","result":"created hello.py printing 'hi' - DONE"}"#;

/// Stub auditor output carrying a DONE verdict.
pub const AUDITOR_DONE: &str =
    r#"{"type":"result","subtype":"success","result":"{\"verdict\": \"DONE\"}"}"#;

/// Stub auditor output requesting a retry with advice.
pub const AUDITOR_RETRY: &str =
    r#"{"type":"result","subtype":"success","result":"RETRY: include units"}"#;

/// Stub auditor output refusing the task.
pub const AUDITOR_IMPOSSIBLE: &str =
    r#"{"type":"result","subtype":"success","result":"IMPOSSIBLE - not a software task"}"#;

/// A sandboxed session: temp working directory plus a stub bin dir that
/// shadows the real agent CLIs.
pub struct Session {
    dir: tempfile::TempDir,
    bin_dir: PathBuf,
    claude_state_dir: PathBuf,
}

impl Session {
    pub fn new() -> Self {
        let dir = tempfile::TempDir::new().unwrap();
        let bin_dir = dir.path().join(".stub-bin");
        let claude_state_dir = dir.path().join(".stub-claude");
        std::fs::create_dir_all(&bin_dir).unwrap();
        std::fs::create_dir_all(&claude_state_dir).unwrap();
        Self {
            dir,
            bin_dir,
            claude_state_dir,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Install a stub `claude` that answers worker calls with
    /// `worker_stream` and auditor calls (detected via the prompt
    /// header) with `auditor_stream`. Every call appends its argv to
    /// `calls.log`.
    pub fn stub_claude(&self, worker_stream: &str, auditor_stream: &str) {
        let script = format!(
            r#"#!/bin/sh
printf '%s' "$*" | tr '\n' ' ' >> "$PWD/calls.log"; echo >> "$PWD/calls.log"
case "$*" in
*"oneshot auditor"*)
cat <<'ONESHOT_STUB_EOF'
{auditor_stream}
ONESHOT_STUB_EOF
;;
*)
cat <<'ONESHOT_STUB_EOF'
{worker_stream}
ONESHOT_STUB_EOF
;;
esac
exit 0
"#
        );
        self.install_stub("claude", &script);
    }

    /// Install a stub agent script under an arbitrary name.
    pub fn install_stub(&self, name: &str, script: &str) {
        let path = self.bin_dir.join(name);
        std::fs::write(&path, script).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    /// Run the oneshot binary with the sandbox environment.
    pub fn oneshot(&self, args: &[&str]) -> RunResult {
        let path_env = format!("{}:/usr/bin:/bin", self.bin_dir.display());
        let output = Command::new(oneshot_binary())
            .args(args)
            .current_dir(self.dir.path())
            .env("PATH", path_env)
            .env("ONESHOT_NO_PTY", "1")
            .env("ONESHOT_GRACE_TIMEOUT_MS", GRACE_TIMEOUT_MS)
            .env("CLAUDE_CONFIG_DIR", &self.claude_state_dir)
            .output()
            .unwrap();
        RunResult::new(output)
    }

    /// Lines of the stub call log (one per agent invocation).
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(String::from)
            .collect()
    }

    /// The single session context document in the directory.
    pub fn context(&self) -> serde_json::Value {
        let path = self.context_path();
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    pub fn context_path(&self) -> PathBuf {
        self.find_one("-oneshot.json")
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.try_find_one("-oneshot-log.json")
    }

    fn find_one(&self, suffix: &str) -> PathBuf {
        self.try_find_one(suffix)
            .unwrap_or_else(|| panic!("no *{suffix} file in session dir"))
    }

    fn try_find_one(&self, suffix: &str) -> Option<PathBuf> {
        std::fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .find(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix) && !n.starts_with('.'))
            })
    }

    /// Recorded state names from the context's state history.
    pub fn history(&self) -> Vec<String> {
        self.context()["state_history"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["state"].as_str().unwrap().to_string())
            .collect()
    }
}

/// Resolve the oneshot binary next to the test executable.
fn oneshot_binary() -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    // target/debug/deps/specs-<hash> → target/debug/oneshot
    let debug_dir = exe.parent().unwrap().parent().unwrap();
    let candidate = debug_dir.join("oneshot");
    if candidate.exists() {
        return candidate;
    }
    // llvm-cov and custom target layouts
    assert_cmd::cargo::cargo_bin("oneshot")
}

/// Captured process result with fluent assertions.
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl RunResult {
    fn new(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            code: output.status.code().unwrap_or(-1),
        }
    }

    pub fn passes(self) -> Self {
        assert_eq!(
            self.code, 0,
            "expected exit 0\nstdout:\n{}\nstderr:\n{}",
            self.stdout, self.stderr
        );
        self
    }

    pub fn exits(self, code: i32) -> Self {
        assert_eq!(
            self.code, code,
            "expected exit {code}\nstdout:\n{}\nstderr:\n{}",
            self.stdout, self.stderr
        );
        self
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(
            self.stdout.contains(needle),
            "stdout missing '{needle}':\n{}",
            self.stdout
        );
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(
            self.stderr.contains(needle),
            "stderr missing '{needle}':\n{}",
            self.stderr
        );
        self
    }
}
