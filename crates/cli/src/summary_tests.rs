// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oneshot_core::{OneshotId, RoleResult};
use oneshot_storage::SessionMetadata;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

fn context(dir: &TempDir) -> ExecutionContext {
    let id = OneshotId::new("2026-07-01_10-00-00-ab12");
    ExecutionContext::create(
        dir.path().join(id.context_file_name()),
        id.clone(),
        SessionMetadata {
            prompt: "task".into(),
            worker_executor: "claude".into(),
            auditor_executor: "claude".into(),
            worker_model: None,
            auditor_model: None,
            workdir: PathBuf::from("/tmp"),
            worker_prompt_header: None,
            auditor_prompt_header: None,
            reworker_prompt_header: None,
            git_commit: None,
            provider_settings: BTreeMap::new(),
        },
        5,
        dir.path().join(id.log_file_name()),
    )
}

#[test]
fn summary_names_state_reason_and_paths() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    ctx.set_state(OneshotState::WorkerExecuting, "worker starting", None);
    ctx.set_state(OneshotState::Failed, "worker exited with Some(2)", None);

    let out = render_summary(&ctx, false);
    assert!(out.contains("state:      FAILED"));
    assert!(out.contains("worker exited with Some(2)"));
    assert!(out.contains("-oneshot.json"));
    assert!(out.contains("-oneshot-log.json"));
    assert!(out.contains("WORKER_EXECUTING"));
}

#[test]
fn interrupted_summary_offers_resume() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    ctx.set_state(OneshotState::Interrupted, "interrupted by user", None);

    let out = render_summary(&ctx, false);
    assert!(out.contains("--resume 2026-07-01_10-00-00-ab12"));
}

#[test]
fn completed_summary_shows_deleted_log_note() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    ctx.set_state(OneshotState::Completed, "auditor accepted the result", None);

    let out = render_summary(&ctx, true);
    assert!(out.contains("deleted after success"));
    assert!(!out.contains("--resume"));
}

#[test]
fn worker_result_is_excerpted() {
    let dir = TempDir::new().unwrap();
    let mut ctx = context(&dir);
    ctx.set_worker_result(RoleResult {
        text: "line one\nline two".into(),
        verdict: None,
        advice: None,
        score: Some(700),
        recorded_at_ms: 0,
    });

    let out = render_summary(&ctx, false);
    assert!(out.contains("  line one"));
    assert!(out.contains("  line two"));
}
