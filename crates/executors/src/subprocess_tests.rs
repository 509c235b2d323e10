// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::stream::StreamItem;
use serial_test::serial;

fn sh(script: &str) -> LaunchSpec {
    LaunchSpec {
        argv: vec!["sh".into(), "-c".into(), script.into()],
        env: Vec::new(),
        stdin_payload: None,
        use_pty: false,
    }
}

async fn collect(mut rx: tokio::sync::mpsc::Receiver<StreamItem>) -> (Vec<u8>, Option<ExitSummary>) {
    let mut bytes = Vec::new();
    let mut exit = None;
    while let Some(item) = rx.recv().await {
        match item {
            StreamItem::Bytes(chunk) => bytes.extend(chunk),
            StreamItem::Exit(summary) => exit = Some(summary),
            _ => {}
        }
    }
    (bytes, exit)
}

#[tokio::test]
#[serial]
async fn streams_stdout_and_reports_exit_zero() {
    let workdir = std::env::temp_dir();
    let (_handle, rx) = spawn_streaming(&sh("printf 'a\\nb\\n'"), &workdir).unwrap();
    let (bytes, exit) = collect(rx).await;
    assert_eq!(bytes, b"a\nb\n");
    assert_eq!(exit.unwrap().code, Some(0));
}

#[tokio::test]
#[serial]
async fn nonzero_exit_carries_stderr_tail() {
    let workdir = std::env::temp_dir();
    let (_handle, rx) =
        spawn_streaming(&sh("echo oops >&2; exit 3"), &workdir).unwrap();
    let (_, exit) = collect(rx).await;
    let exit = exit.unwrap();
    assert_eq!(exit.code, Some(3));
    assert!(exit.stderr_tail.contains("oops"));
}

#[tokio::test]
#[serial]
async fn missing_binary_is_a_launch_error() {
    let spec = LaunchSpec {
        argv: vec!["definitely-not-a-real-binary-xyz".into()],
        env: Vec::new(),
        stdin_payload: None,
        use_pty: false,
    };
    let err = spawn_streaming(&spec, &std::env::temp_dir()).unwrap_err();
    assert!(matches!(err, ExecutorError::MissingBinary(_)));
}

#[tokio::test]
#[serial]
async fn stdin_payload_is_delivered_and_closed() {
    let workdir = std::env::temp_dir();
    let spec = LaunchSpec {
        argv: vec!["sh".into(), "-c".into(), "cat".into()],
        env: Vec::new(),
        stdin_payload: Some("the prompt\n".into()),
        use_pty: false,
    };
    let (_handle, rx) = spawn_streaming(&spec, &workdir).unwrap();
    let (bytes, exit) = collect(rx).await;
    assert_eq!(bytes, b"the prompt\n");
    assert_eq!(exit.unwrap().code, Some(0));
}

#[tokio::test]
#[serial]
async fn env_vars_reach_the_agent() {
    let workdir = std::env::temp_dir();
    let spec = LaunchSpec {
        argv: vec!["sh".into(), "-c".into(), "printf '%s' \"$ONESHOT_TEST_VAR\"".into()],
        env: vec![("ONESHOT_TEST_VAR".into(), "visible".into())],
        stdin_payload: None,
        use_pty: false,
    };
    let (_handle, rx) = spawn_streaming(&spec, &workdir).unwrap();
    let (bytes, _) = collect(rx).await;
    assert_eq!(bytes, b"visible");
}

#[tokio::test]
#[serial]
async fn terminate_stops_a_hung_process() {
    let workdir = std::env::temp_dir();
    let (mut handle, mut rx) = spawn_streaming(&sh("sleep 60"), &workdir).unwrap();
    assert!(handle.pid().is_some());

    handle.terminate(Duration::from_millis(300)).await;

    // The reader observes the death and reports a non-zero/signal exit.
    let mut exit = None;
    while let Some(item) = rx.recv().await {
        if let StreamItem::Exit(summary) = item {
            exit = Some(summary);
        }
    }
    let exit = exit.unwrap();
    assert_ne!(exit.code, Some(0));
}

#[tokio::test]
#[serial]
async fn terminate_twice_is_a_no_op() {
    let workdir = std::env::temp_dir();
    let (mut handle, rx) = spawn_streaming(&sh("sleep 60"), &workdir).unwrap();
    handle.terminate(Duration::from_millis(200)).await;
    handle.terminate(Duration::from_millis(200)).await;
    let (_, exit) = collect(rx).await;
    assert!(exit.is_some());
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn pty_fallback_when_disabled_by_env() {
    // With ONESHOT_NO_PTY set, a use_pty spec still runs over pipes.
    std::env::set_var("ONESHOT_NO_PTY", "1");
    let spec = LaunchSpec {
        argv: vec!["sh".into(), "-c".into(), "printf ok".into()],
        env: Vec::new(),
        stdin_payload: None,
        use_pty: true,
    };
    let (_handle, rx) = spawn_streaming(&spec, &std::env::temp_dir()).unwrap();
    let (bytes, exit) = collect(rx).await;
    std::env::remove_var("ONESHOT_NO_PTY");
    assert_eq!(bytes, b"ok");
    assert_eq!(exit.unwrap().code, Some(0));
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn pty_streams_and_reports_exit() {
    std::env::remove_var("ONESHOT_NO_PTY");
    let spec = LaunchSpec {
        argv: vec!["sh".into(), "-c".into(), "printf 'tty-out'".into()],
        env: Vec::new(),
        stdin_payload: None,
        use_pty: true,
    };
    let (_handle, rx) = spawn_streaming(&spec, &std::env::temp_dir()).unwrap();
    let (bytes, exit) = collect(rx).await;
    assert!(String::from_utf8_lossy(&bytes).contains("tty-out"));
    assert_eq!(exit.unwrap().code, Some(0));
}
