// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[yare::parameterized(
    simple        = { "key=value", "key", "value" },
    empty_value   = { "key=", "key", "" },
    equals_inside = { "key=a=b", "key", "a=b" },
)]
fn key_value_parses(input: &str, key: &str, value: &str) {
    assert_eq!(
        parse_key_value(input).unwrap(),
        (key.to_string(), value.to_string())
    );
}

#[yare::parameterized(
    no_equals  = { "keyvalue" },
    empty_key  = { "=value" },
    empty      = { "" },
)]
fn bad_key_value_rejects(input: &str) {
    assert!(parse_key_value(input).is_err());
}

#[test]
fn defaults_match_the_documented_surface() {
    let cli = Cli::parse_from(["oneshot", "do something"]);
    assert_eq!(cli.executor, "claude");
    assert_eq!(cli.inactivity_timeout, 300);
    assert_eq!(cli.max_timeout, 3600);
    assert!(cli.max_iterations.is_none());
    assert!(!cli.keep_log);
    assert!(cli.resume.is_none());
}

#[test]
fn bare_resume_flag_means_most_recent() {
    let cli = Cli::parse_from(["oneshot", "--resume"]);
    assert_eq!(cli.resume.as_deref(), Some(""));
}

#[test]
fn resume_accepts_an_id() {
    let cli = Cli::parse_from(["oneshot", "--resume", "2026-07-01_10-00-00-ab12"]);
    assert_eq!(cli.resume.as_deref(), Some("2026-07-01_10-00-00-ab12"));
}

#[test]
fn vars_accumulate() {
    let cli = Cli::parse_from(["oneshot", "task", "--var", "a=1", "--var", "b=2"]);
    assert_eq!(
        cli.var,
        vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]
    );
}
