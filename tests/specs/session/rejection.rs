//! Scenario: the auditor declares the task impossible.

use crate::prelude::*;

#[test]
fn impossible_verdict_exits_rejected() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_IMPOSSIBLE);

    session
        .oneshot(&["Order a pizza to my house"])
        .exits(2)
        .stdout_has("state:      REJECTED");

    assert_eq!(session.context()["state"], "REJECTED");
}

#[test]
fn rejected_sessions_refuse_resume() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_IMPOSSIBLE);
    session.oneshot(&["Order a pizza to my house"]).exits(2);

    // Re-running would reproduce the refusal.
    session
        .oneshot(&["--resume"])
        .exits(2)
        .stderr_has("rejected");
}
