//! Resume behavior: picking up interrupted and mid-execution sessions.

use crate::prelude::*;

/// Write a context file as a previous oneshot process would have left it.
fn write_context(session: &Session, id: &str, state: &str, history: &[&str]) {
    let history: Vec<serde_json::Value> = history
        .iter()
        .enumerate()
        .map(|(i, s)| {
            serde_json::json!({
                "state": s,
                "timestamp_ms": 1_750_000_000_000_i64 + i as i64,
                "reason": "recorded by previous run"
            })
        })
        .collect();
    let doc = serde_json::json!({
        "schema_version": 1,
        "oneshot_id": id,
        "state": state,
        "iteration_count": 1,
        "max_iterations": 5,
        "created_at": "2026-07-01T10:00:00Z",
        "updated_at": "2026-07-01T10:00:30Z",
        "metadata": {
            "prompt": "finish the report",
            "worker_executor": "claude",
            "auditor_executor": "claude",
            "workdir": session.path(),
        },
        "state_history": history,
        "session_log_path": session.path().join(format!("{id}-oneshot-log.json")),
    });
    std::fs::write(
        session.path().join(format!("{id}-oneshot.json")),
        serde_json::to_vec_pretty(&doc).unwrap(),
    )
    .unwrap();
}

#[test]
fn interrupted_worker_resumes_through_recovery() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    let id = "2026-07-01_10-00-00-ab12";
    write_context(
        &session,
        id,
        "INTERRUPTED",
        &["CREATED", "WORKER_EXECUTING", "INTERRUPTED"],
    );

    // No claude session state exists, so recovery finds nothing.
    session.oneshot(&["--resume", id]).exits(1);

    let history = session.history();
    assert!(history.contains(&"RECOVERY_PENDING".to_string()));
    assert_eq!(session.context()["state"], "FAILED");
}

#[test]
fn mid_execution_context_is_treated_as_a_possible_zombie() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    let id = "2026-07-01_10-00-00-ab12";
    write_context(
        &session,
        id,
        "WORKER_EXECUTING",
        &["CREATED", "WORKER_EXECUTING"],
    );

    session.oneshot(&["--resume", id]).exits(1);
    assert!(session.history().contains(&"RECOVERY_PENDING".to_string()));
}

#[test]
fn bare_resume_picks_the_most_recent_session() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    write_context(
        &session,
        "2026-07-01_09-00-00-old1",
        "AUDIT_PENDING",
        &["CREATED", "WORKER_EXECUTING", "AUDIT_PENDING"],
    );
    write_context(
        &session,
        "2026-07-01_11-00-00-new1",
        "AUDIT_PENDING",
        &["CREATED", "WORKER_EXECUTING", "AUDIT_PENDING"],
    );

    session.oneshot(&["--resume"]).passes();

    let newest: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(
            session
                .path()
                .join("2026-07-01_11-00-00-new1-oneshot.json"),
        )
        .unwrap(),
    )
    .unwrap();
    assert_eq!(newest["state"], "COMPLETED");
}

#[test]
fn resume_with_unknown_id_is_a_usage_error() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    session
        .oneshot(&["--resume", "2099-01-01_00-00-00-none"])
        .exits(64)
        .stderr_has("no session found");
}

#[test]
fn corrupt_context_gets_its_own_exit_code_and_is_preserved() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    let path = session.path().join("2026-07-01_10-00-00-bad1-oneshot.json");
    std::fs::write(&path, "{definitely not json").unwrap();

    session
        .oneshot(&["--resume", "2026-07-01_10-00-00-bad1"])
        .exits(4)
        .stderr_has("corrupt");

    // Never overwritten.
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "{definitely not json"
    );
}
