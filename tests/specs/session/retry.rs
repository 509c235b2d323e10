//! Scenario: first audit requests a retry; the second accepts.

use crate::prelude::*;

/// Stub whose auditor answers RETRY on the first call and DONE after,
/// tracked through a marker file in the session directory.
fn stub_retry_then_done(session: &Session) {
    let script = format!(
        r#"#!/bin/sh
printf '%s' "$*" | tr '\n' ' ' >> "$PWD/calls.log"; echo >> "$PWD/calls.log"
case "$*" in
*"oneshot auditor"*)
if [ -f "$PWD/.audited-once" ]; then
cat <<'ONESHOT_STUB_EOF'
{done}
ONESHOT_STUB_EOF
else
touch "$PWD/.audited-once"
cat <<'ONESHOT_STUB_EOF'
{retry}
ONESHOT_STUB_EOF
fi
;;
*)
cat <<'ONESHOT_STUB_EOF'
{worker}
ONESHOT_STUB_EOF
;;
esac
exit 0
"#,
        done = AUDITOR_DONE,
        retry = AUDITOR_RETRY,
        worker = WORKER_STREAM,
    );
    session.install_stub("claude", &script);
}

#[test]
fn second_iteration_completes() {
    let session = Session::new();
    stub_retry_then_done(&session);

    session.oneshot(&["Compute 2+2"]).passes();

    let ctx = session.context();
    assert_eq!(ctx["state"], "COMPLETED");
    assert_eq!(ctx["iteration_count"], 2);

    let history = session.history();
    assert!(history.contains(&"REITERATION_PENDING".to_string()));
}

#[test]
fn reworker_prompt_contains_the_advice() {
    let session = Session::new();
    stub_retry_then_done(&session);
    session.oneshot(&["Compute 2+2"]).passes();

    // worker, auditor, reworker, auditor
    let calls = session.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[2].contains("include units"));
    assert!(calls[2].contains("revising a previous attempt"));
    assert!(!calls[0].contains("include units"));
}
