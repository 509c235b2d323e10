//! Help and version surface.

use crate::prelude::*;

#[test]
fn help_documents_the_loop_options() {
    let session = Session::new();
    session
        .oneshot(&["--help"])
        .passes()
        .stdout_has("--executor")
        .stdout_has("--auditor-executor")
        .stdout_has("--max-iterations")
        .stdout_has("--inactivity-timeout")
        .stdout_has("--resume")
        .stdout_has("--keep-log");
}

#[test]
fn version_prints_and_exits_zero() {
    let session = Session::new();
    session.oneshot(&["--version"]).passes().stdout_has("oneshot");
}
