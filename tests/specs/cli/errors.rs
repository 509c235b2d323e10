//! CLI error handling specs.

use crate::prelude::*;

#[test]
fn missing_prompt_is_a_usage_error() {
    let session = Session::new();
    session
        .oneshot(&[])
        .exits(64)
        .stderr_has("a task prompt is required");
}

#[test]
fn unknown_executor_lists_the_known_ones() {
    let session = Session::new();
    session
        .oneshot(&["task", "--executor", "copilot"])
        .exits(64)
        .stderr_has("unknown executor: copilot")
        .stderr_has("claude");
}

#[test]
fn missing_agent_binary_is_a_configuration_error() {
    let session = Session::new();
    // No stub installed: the sandboxed PATH has no `claude`.
    session
        .oneshot(&["task"])
        .exits(64)
        .stderr_has("not found");

    // The session was walked to FAILED rather than left dangling.
    assert_eq!(session.context()["state"], "FAILED");
}

#[test]
fn missing_workdir_is_a_usage_error() {
    let session = Session::new();
    session
        .oneshot(&["task", "--workdir", "/definitely/not/a/dir"])
        .exits(64)
        .stderr_has("working directory does not exist");
}

#[test]
fn bad_var_syntax_is_rejected_by_the_parser() {
    let session = Session::new();
    let result = session.oneshot(&["task", "--var", "no-equals-sign"]);
    assert_ne!(result.code, 0);
    assert!(result.stderr.contains("key=value"));
}
