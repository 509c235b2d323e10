//! Scenario: worker succeeds, auditor accepts on the first iteration.

use crate::prelude::*;

#[test]
fn completes_with_exit_zero_and_one_iteration() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);

    session
        .oneshot(&["Write hello.py printing 'hi'", "--keep-log"])
        .passes()
        .stdout_has("state:      COMPLETED");

    let ctx = session.context();
    assert_eq!(ctx["state"], "COMPLETED");
    assert_eq!(ctx["iteration_count"], 1);
    assert_eq!(
        session.history(),
        vec![
            "CREATED",
            "WORKER_EXECUTING",
            "AUDIT_PENDING",
            "AUDITOR_EXECUTING",
            "COMPLETED",
        ]
    );
}

#[test]
fn log_lines_all_parse_and_include_a_completion() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    session.oneshot(&["task", "--keep-log"]).passes();

    let log = std::fs::read_to_string(session.log_path().unwrap()).unwrap();
    let mut completions = 0;
    for line in log.lines() {
        let envelope: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(envelope["ts_ms"].is_i64());
        assert!(envelope["oneshot_id"].is_string());
        if envelope["data"]["type"] == "completion_result" {
            completions += 1;
        }
    }
    assert!(completions >= 1, "log must anchor a completion_result");
}

#[test]
fn auto_named_log_is_deleted_on_success_by_default() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    session
        .oneshot(&["task"])
        .passes()
        .stdout_has("deleted after success");

    assert!(session.log_path().is_none());
    // The context survives for later inspection.
    assert_eq!(session.context()["state"], "COMPLETED");
}

#[test]
fn explicit_session_log_is_kept() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    let log = session.path().join("my-log.ndjson");
    session
        .oneshot(&["task", "--session-log", log.to_str().unwrap()])
        .passes();
    assert!(log.exists());
}

#[test]
fn worker_prompt_carries_the_correlation_header() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_DONE);
    session.oneshot(&["task"]).passes();

    let calls = session.calls();
    assert_eq!(calls.len(), 2);
    let id = session.context()["oneshot_id"].as_str().unwrap().to_string();
    assert!(calls[0].contains(&format!("oneshot worker {id}")));
    assert!(calls[1].contains(&format!("oneshot auditor {id}")));
}
