// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session file discovery for `--resume`.

use std::path::{Path, PathBuf};

const CONTEXT_SUFFIX: &str = "-oneshot.json";

/// Find the most recent session context file in a directory.
///
/// Session ids sort chronologically, so the lexicographically largest
/// file name wins; modification time breaks ties for hand-renamed files.
pub fn find_latest_session(dir: &Path) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(CONTEXT_SUFFIX) && !n.starts_with('.'))
        })
        .collect();
    candidates.sort();
    candidates.pop()
}

/// Resolve a `--resume` argument to a context file path.
///
/// Accepts a full path, a bare session id, or nothing (most recent
/// session in `dir`). Returns `None` when nothing matches.
pub fn resolve_resume_target(arg: Option<&str>, dir: &Path) -> Option<PathBuf> {
    match arg {
        None | Some("") => find_latest_session(dir),
        Some(arg) => {
            let as_path = PathBuf::from(arg);
            if as_path.is_file() {
                return Some(as_path);
            }
            let by_id = dir.join(format!("{}{}", arg, CONTEXT_SUFFIX));
            if by_id.is_file() {
                return Some(by_id);
            }
            None
        }
    }
}

#[cfg(test)]
#[path = "discover_tests.rs"]
mod tests;
