// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    cline  = { "cline",  "cline" },
    claude = { "claude", "claude" },
    gemini = { "gemini", "gemini" },
    aider  = { "aider",  "aider" },
    direct = { "direct", "direct" },
    ollama_alias = { "ollama", "direct" },
)]
fn from_name_resolves(name: &str, expected: &str) {
    let executor = AgentExecutor::from_name(name).unwrap();
    assert_eq!(executor.name(), expected);
}

#[test]
fn unknown_name_is_an_error() {
    let err = AgentExecutor::from_name("copilot").unwrap_err();
    assert!(matches!(err, ExecutorError::UnknownExecutor(name) if name == "copilot"));
}

#[test]
fn known_names_all_resolve() {
    for name in AgentExecutor::known_names() {
        assert!(AgentExecutor::from_name(name).is_ok(), "{name}");
    }
}

#[test]
fn dialects_per_executor() {
    assert_eq!(
        AgentExecutor::from_name("cline").unwrap().dialect(),
        PromptDialect::Markdown
    );
    assert_eq!(
        AgentExecutor::from_name("claude").unwrap().dialect(),
        PromptDialect::Xml
    );
}

#[test]
fn code_writing_executors_capture_git_commits() {
    for name in ["cline", "claude", "gemini", "aider"] {
        assert!(AgentExecutor::from_name(name).unwrap().should_capture_git_commit());
    }
    assert!(!AgentExecutor::from_name("direct").unwrap().should_capture_git_commit());
}

#[test]
fn only_direct_bounds_prompt_length() {
    assert!(AgentExecutor::from_name("direct").unwrap().max_prompt_len().is_some());
    assert!(AgentExecutor::from_name("claude").unwrap().max_prompt_len().is_none());
}
