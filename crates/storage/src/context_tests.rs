// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use oneshot_core::{OneshotId, OneshotState};
use tempfile::TempDir;

fn metadata() -> SessionMetadata {
    SessionMetadata {
        prompt: "write hello.py".into(),
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
    }
}

fn fresh(dir: &TempDir) -> ExecutionContext {
    let id = OneshotId::new("2026-07-01_10-00-00-ab12");
    ExecutionContext::create(
        dir.path().join(id.context_file_name()),
        id.clone(),
        metadata(),
        5,
        dir.path().join(id.log_file_name()),
    )
}

#[test]
fn create_starts_in_created_with_history() {
    let dir = TempDir::new().unwrap();
    let ctx = fresh(&dir);
    assert_eq!(ctx.state, OneshotState::Created);
    assert_eq!(ctx.iteration_count, 0);
    assert_eq!(ctx.state_history.len(), 1);
    assert_eq!(ctx.state_history[0].state, OneshotState::Created);
}

#[test]
fn save_then_load_round_trips() {
    let dir = TempDir::new().unwrap();
    let mut ctx = fresh(&dir);
    ctx.set_state(OneshotState::WorkerExecuting, "worker started", Some(1234));
    ctx.increment_iteration();
    ctx.set_variable("team", "platform");
    ctx.save().unwrap();

    let loaded = ExecutionContext::load(ctx.path()).unwrap();
    assert_eq!(loaded.state, OneshotState::WorkerExecuting);
    assert_eq!(loaded.iteration_count, 1);
    assert_eq!(loaded.variables.get("team").map(String::as_str), Some("platform"));
    assert_eq!(loaded.state_history.len(), 2);
    assert_eq!(loaded.state_history[1].pid, Some(1234));
    assert_eq!(loaded.path(), ctx.path());
}

#[test]
fn save_is_atomic_over_existing_file() {
    let dir = TempDir::new().unwrap();
    let mut ctx = fresh(&dir);
    ctx.save().unwrap();

    ctx.set_state(OneshotState::WorkerExecuting, "restart", None);
    ctx.save().unwrap();

    // No temp droppings left behind
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().all(|n| !n.contains(".tmp-")), "{names:?}");

    // And the file parses to the new value
    let loaded = ExecutionContext::load(ctx.path()).unwrap();
    assert_eq!(loaded.state, OneshotState::WorkerExecuting);
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = ExecutionContext::load(&dir.path().join("nope-oneshot.json")).unwrap_err();
    assert!(matches!(err, ContextError::NotFound(_)));
}

#[test]
fn garbage_file_is_corrupt_not_missing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad-oneshot.json");
    std::fs::write(&path, "{not json").unwrap();
    let err = ExecutionContext::load(&path).unwrap_err();
    assert!(matches!(err, ContextError::Corrupt { .. }));
}

#[test]
fn newer_schema_fails_loudly() {
    let dir = TempDir::new().unwrap();
    let mut ctx = fresh(&dir);
    ctx.schema_version = CURRENT_SCHEMA_VERSION + 1;
    ctx.save().unwrap();

    let err = ExecutionContext::load(ctx.path()).unwrap_err();
    assert!(matches!(
        err,
        ContextError::TooNew { found, .. } if found == CURRENT_SCHEMA_VERSION + 1
    ));
}

#[test]
fn missing_optional_fields_fill_defaults() {
    // A v1 file written before `variables` existed still loads.
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("old-oneshot.json");
    let doc = serde_json::json!({
        "schema_version": 1,
        "oneshot_id": "2026-01-01_00-00-00-aaaa",
        "state": "CREATED",
        "iteration_count": 0,
        "max_iterations": 5,
        "created_at": "2026-01-01T00:00:00Z",
        "updated_at": "2026-01-01T00:00:00Z",
        "metadata": {
            "prompt": "p",
            "worker_executor": "claude",
            "auditor_executor": "claude",
            "workdir": "/tmp"
        },
        "session_log_path": "/tmp/x-oneshot-log.json"
    });
    std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

    let ctx = ExecutionContext::load(&path).unwrap();
    assert!(ctx.variables.is_empty());
    assert!(ctx.state_history.is_empty());
    assert!(ctx.worker_result.is_none());
}

#[test]
fn last_state_before_interrupt_skips_trailing_interrupts() {
    let dir = TempDir::new().unwrap();
    let mut ctx = fresh(&dir);
    ctx.set_state(OneshotState::WorkerExecuting, "worker started", None);
    ctx.set_state(OneshotState::Interrupted, "SIGINT", None);
    assert_eq!(
        ctx.last_state_before_interrupt(),
        Some(OneshotState::WorkerExecuting)
    );
}

#[test]
fn state_history_replay_reproduces_current_state() {
    // Replaying the recorded states lands on the stored state.
    let dir = TempDir::new().unwrap();
    let mut ctx = fresh(&dir);
    ctx.set_state(OneshotState::WorkerExecuting, "worker started", None);
    ctx.set_state(OneshotState::AuditPending, "worker succeeded", None);
    ctx.set_state(OneshotState::AuditorExecuting, "audit started", None);
    ctx.set_state(OneshotState::Completed, "verdict DONE", None);

    let replayed = ctx.state_history.last().map(|c| c.state);
    assert_eq!(replayed, Some(ctx.state));
}
