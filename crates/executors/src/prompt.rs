// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-executor prompt formatting.
//!
//! Two dialects render the same logical sections: XML-tagged (default)
//! and Markdown headers for agents whose own prompting collides with
//! angle brackets (cline). The user header is always prepended verbatim;
//! it carries the correlation id that agents echo into their own task
//! storage.

use oneshot_core::ResultSummary;
use std::collections::BTreeMap;

/// Section rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptDialect {
    Xml,
    Markdown,
}

/// Which invocation of the loop is being prompted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptRole {
    /// First worker iteration
    Worker,
    /// Iteration ≥ 2, incorporates auditor advice
    Reworker,
    Auditor,
}

/// Everything a prompt render needs.
#[derive(Debug, Clone)]
pub struct PromptInput<'a> {
    /// The task text
    pub task: &'a str,
    /// Header line prepended verbatim (carries the correlation id)
    pub header: &'a str,
    /// Role preamble, from the executor's `system_instructions`
    pub system: &'a str,
    /// Worker result, present for auditor prompts
    pub summary: Option<&'a ResultSummary>,
    /// Auditor advice, present for reworker prompts
    pub advice: Option<&'a str>,
}

/// Render a prompt in the given dialect.
///
/// Empty sections are omitted entirely, never emitted as empty tags.
pub fn format_prompt(dialect: PromptDialect, role: PromptRole, input: &PromptInput<'_>) -> String {
    let mut out = String::new();
    out.push_str(input.header);
    out.push_str("\n\n");
    out.push_str(input.system);
    out.push_str("\n\n");

    match dialect {
        PromptDialect::Xml => render_xml(role, input, &mut out),
        PromptDialect::Markdown => render_markdown(role, input, &mut out),
    }

    out.trim_end().to_string()
}

fn render_xml(role: PromptRole, input: &PromptInput<'_>, out: &mut String) {
    out.push_str("<oneshot>\n");
    xml_section(out, "instruction", input.task, 1);

    if let Some(summary) = input.summary {
        out.push_str("  <worker-result>\n");
        xml_section(out, "result", &summary.result, 2);
        if !summary.leading_context.is_empty() {
            xml_section(out, "leading-context", &summary.leading_context.join("\n"), 2);
        }
        if !summary.trailing_context.is_empty() {
            xml_section(out, "trailing-context", &summary.trailing_context.join("\n"), 2);
        }
        out.push_str("  </worker-result>\n");
    }

    if role == PromptRole::Reworker {
        if let Some(advice) = input.advice.filter(|a| !a.trim().is_empty()) {
            xml_section(out, "auditor-feedback", advice, 1);
        }
    }

    out.push_str("</oneshot>\n");
}

fn xml_section(out: &mut String, tag: &str, body: &str, indent: usize) {
    let pad = "  ".repeat(indent);
    out.push_str(&format!("{pad}<{tag}>\n{body}\n{pad}</{tag}>\n"));
}

fn render_markdown(role: PromptRole, input: &PromptInput<'_>, out: &mut String) {
    out.push_str("# Oneshot\n\n");
    out.push_str("## Instruction\n\n");
    out.push_str(input.task);
    out.push_str("\n\n");

    if let Some(summary) = input.summary {
        out.push_str("## Worker Result\n\n");
        out.push_str(&summary.result);
        out.push_str("\n\n");
        if !summary.leading_context.is_empty() {
            out.push_str("### Leading Context\n\n");
            out.push_str(&summary.leading_context.join("\n"));
            out.push_str("\n\n");
        }
        if !summary.trailing_context.is_empty() {
            out.push_str("### Trailing Context\n\n");
            out.push_str(&summary.trailing_context.join("\n"));
            out.push_str("\n\n");
        }
    }

    if role == PromptRole::Reworker {
        if let Some(advice) = input.advice.filter(|a| !a.trim().is_empty()) {
            out.push_str("## Auditor Feedback\n\n");
            out.push_str(advice);
            out.push_str("\n\n");
        }
    }
}

/// Role preamble shared by all dialects.
pub fn default_system_instructions(role: PromptRole) -> String {
    match role {
        PromptRole::Worker => {
            "You are the worker. Complete the task below and finish with a clear \
             final answer. State DONE when the task is complete."
                .to_string()
        }
        PromptRole::Reworker => {
            "You are the worker, revising a previous attempt. Apply the auditor \
             feedback below, then finish with a clear final answer. State DONE \
             when the task is complete."
                .to_string()
        }
        PromptRole::Auditor => {
            "You are the auditor. Judge whether the worker result below completes \
             the task. Answer with exactly one verdict token: DONE if acceptable, \
             RETRY with one line of advice if it needs another attempt, or \
             IMPOSSIBLE if the task cannot be done by a software agent."
                .to_string()
        }
    }
}

/// Substitute `{key}` placeholders from the session variable map.
///
/// Unknown placeholders are left as-is so a literal brace in a header
/// never corrupts the prompt.
pub fn substitute_vars(template: &str, vars: &BTreeMap<String, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{}}}", key), value);
    }
    out
}

/// Truncate a prompt to an executor's cap, cutting at a char boundary and
/// marking the cut.
pub fn truncate_prompt(prompt: &str, max_len: Option<usize>) -> String {
    const MARKER: &str = "\n…[truncated]";
    match max_len {
        Some(max) if prompt.len() > max => {
            let budget = max.saturating_sub(MARKER.len());
            let mut cut = budget;
            while cut > 0 && !prompt.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}{}", &prompt[..cut], MARKER)
        }
        _ => prompt.to_string(),
    }
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
