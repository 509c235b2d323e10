//! Scenario: the iteration budget runs out.

use crate::prelude::*;

#[test]
fn three_retries_exhaust_a_budget_of_three() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_RETRY);

    session
        .oneshot(&["task", "--max-iterations", "3"])
        .exits(1)
        .stdout_has("iteration cap of 3");

    let ctx = session.context();
    assert_eq!(ctx["state"], "FAILED");
    assert_eq!(ctx["iteration_count"], 3);

    // Three worker runs and three audits before the cap closed the loop.
    let calls = session.calls();
    let workers = calls.iter().filter(|c| c.contains("oneshot worker")).count();
    let audits = calls.iter().filter(|c| c.contains("oneshot auditor")).count();
    assert_eq!(workers, 3);
    assert_eq!(audits, 3);
}

#[test]
fn budget_of_one_fails_on_the_first_retry() {
    let session = Session::new();
    session.stub_claude(WORKER_STREAM, AUDITOR_RETRY);

    session
        .oneshot(&["task", "--max-iterations", "1"])
        .exits(1)
        .stdout_has("iteration cap of 1");

    assert_eq!(session.calls().len(), 2);
}
