// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn pty_flag_parses() {
    std::env::remove_var("ONESHOT_NO_PTY");
    assert!(!pty_disabled());

    std::env::set_var("ONESHOT_NO_PTY", "1");
    assert!(pty_disabled());

    std::env::set_var("ONESHOT_NO_PTY", "0");
    assert!(!pty_disabled());

    std::env::remove_var("ONESHOT_NO_PTY");
}

#[test]
#[serial]
fn grace_timeout_defaults_and_overrides() {
    std::env::remove_var("ONESHOT_GRACE_TIMEOUT_MS");
    assert_eq!(grace_timeout(), Duration::from_millis(5_000));

    std::env::set_var("ONESHOT_GRACE_TIMEOUT_MS", "250");
    assert_eq!(grace_timeout(), Duration::from_millis(250));

    std::env::set_var("ONESHOT_GRACE_TIMEOUT_MS", "not-a-number");
    assert_eq!(grace_timeout(), Duration::from_millis(5_000));

    std::env::remove_var("ONESHOT_GRACE_TIMEOUT_MS");
}

#[test]
#[serial]
fn ollama_base_url_default() {
    std::env::remove_var("OLLAMA_BASE_URL");
    assert_eq!(ollama_base_url(), "http://localhost:11434");

    std::env::set_var("OLLAMA_BASE_URL", "http://10.0.0.2:11434");
    assert_eq!(ollama_base_url(), "http://10.0.0.2:11434");

    std::env::remove_var("OLLAMA_BASE_URL");
}

#[test]
#[serial]
fn claude_config_dir_override() {
    std::env::set_var("CLAUDE_CONFIG_DIR", "/tmp/claude-test");
    assert_eq!(claude_config_dir(), PathBuf::from("/tmp/claude-test"));
    std::env::remove_var("CLAUDE_CONFIG_DIR");
}
