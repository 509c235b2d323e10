// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lenient verdict extraction from auditor output.
//!
//! Auditors are told to answer with `DONE`, `RETRY`, or `IMPOSSIBLE`, but
//! real models wrap that in prose, JSON, or markdown fences. Parsing is an
//! ordered list of strategies; the first one that matches wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Categorical auditor verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Done,
    Retry,
    Impossible,
    Unknown,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Done => "DONE",
            Verdict::Retry => "RETRY",
            Verdict::Impossible => "IMPOSSIBLE",
            Verdict::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// A parsed verdict with optional advice for the next worker iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedVerdict {
    pub verdict: Verdict,
    pub advice: Option<String>,
}

impl ParsedVerdict {
    fn bare(verdict: Verdict) -> Self {
        Self {
            verdict,
            advice: None,
        }
    }
}

/// One parsing strategy. Returns `None` when the strategy does not apply.
trait VerdictStrategy {
    fn parse(&self, text: &str) -> Option<ParsedVerdict>;
}

/// Parse the auditor's output text.
///
/// Strategies in order: strict JSON with a `verdict`/`status` key, a
/// key-pattern regex over free text, then bare token scanning. No match
/// yields `Unknown`; the engine treats that as `Retry` unless the
/// iteration budget is exhausted.
pub fn parse_verdict(text: &str) -> ParsedVerdict {
    let strategies: [&dyn VerdictStrategy; 3] = [&JsonStrategy, &KeyPatternStrategy, &TokenStrategy];
    for strategy in strategies {
        if let Some(parsed) = strategy.parse(text) {
            return parsed;
        }
    }
    ParsedVerdict::bare(Verdict::Unknown)
}

/// Map a verdict word (case-insensitive) to a category.
fn classify_token(token: &str) -> Option<Verdict> {
    let upper = token.to_ascii_uppercase();
    match upper.as_str() {
        "DONE" | "SUCCESS" | "COMPLETED" => Some(Verdict::Done),
        "RETRY" | "REITERATE" | "CONTINUE" => Some(Verdict::Retry),
        "IMPOSSIBLE" | "REJECTED" | "CANNOT" => Some(Verdict::Impossible),
        _ => None,
    }
}

/// Strict JSON document with a `verdict` or `status` key at the top level
/// (or one level down, for models that wrap their answer in an object).
struct JsonStrategy;

impl VerdictStrategy for JsonStrategy {
    fn parse(&self, text: &str) -> Option<ParsedVerdict> {
        let value: serde_json::Value = serde_json::from_str(text.trim()).ok()?;
        let verdict = json_verdict(&value)?;
        let advice = ["advice", "feedback", "reason"]
            .iter()
            .find_map(|key| value.get(key).and_then(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_string());
        Some(ParsedVerdict { verdict, advice })
    }
}

fn json_verdict(value: &serde_json::Value) -> Option<Verdict> {
    for key in ["verdict", "status"] {
        if let Some(v) = value.get(key).and_then(|v| v.as_str()) {
            if let Some(verdict) = classify_token(v.trim()) {
                return Some(verdict);
            }
        }
    }
    // One level of nesting: {"result": {"verdict": "DONE"}}
    if let Some(obj) = value.as_object() {
        for nested in obj.values() {
            if nested.is_object() {
                if let Some(verdict) = json_verdict(nested) {
                    return Some(verdict);
                }
            }
        }
    }
    None
}

/// `"verdict": "X"` / `status = X` patterns inside otherwise free text.
struct KeyPatternStrategy;

fn key_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)["']?(?:verdict|status)["']?\s*[:=]\s*["']?([A-Za-z]+)["']?"#).ok()
    })
    .as_ref()
}

impl VerdictStrategy for KeyPatternStrategy {
    fn parse(&self, text: &str) -> Option<ParsedVerdict> {
        let re = key_pattern()?;
        for capture in re.captures_iter(text) {
            if let Some(verdict) = capture.get(1).and_then(|m| classify_token(m.as_str())) {
                return Some(ParsedVerdict {
                    verdict,
                    advice: advice_after_verdict(text),
                });
            }
        }
        None
    }
}

/// Bare verdict tokens anywhere in the text. `DONE` outranks the others so
/// that "DONE" is honored even when the auditor rambles about retries.
struct TokenStrategy;

fn token_pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(DONE|SUCCESS|COMPLETED|RETRY|REITERATE|CONTINUE|IMPOSSIBLE|REJECTED|CANNOT)\b",
        )
        .ok()
    })
    .as_ref()
}

impl VerdictStrategy for TokenStrategy {
    fn parse(&self, text: &str) -> Option<ParsedVerdict> {
        let re = token_pattern()?;
        let mut found: Option<Verdict> = None;
        for m in re.find_iter(text) {
            let Some(verdict) = classify_token(m.as_str()) else {
                continue;
            };
            match verdict {
                Verdict::Done => return Some(self.with_advice(Verdict::Done, text)),
                Verdict::Retry if found.is_none() => found = Some(Verdict::Retry),
                Verdict::Impossible if found.is_none() => found = Some(Verdict::Impossible),
                _ => {}
            }
        }
        found.map(|verdict| self.with_advice(verdict, text))
    }
}

impl TokenStrategy {
    fn with_advice(&self, verdict: Verdict, text: &str) -> ParsedVerdict {
        let advice = match verdict {
            Verdict::Retry => advice_after_verdict(text),
            _ => None,
        };
        ParsedVerdict { verdict, advice }
    }
}

/// Text following `RETRY:` / `RETRY -` is the auditor's advice line.
fn advice_after_verdict(text: &str) -> Option<String> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = RE
        .get_or_init(|| Regex::new(r"(?i)\b(?:RETRY|REITERATE)\b\s*[:\-]\s*(.+)").ok())
        .as_ref()?;
    let advice = re.captures(text)?.get(1)?.as_str().trim();
    if advice.is_empty() {
        None
    } else {
        Some(advice.to_string())
    }
}

#[cfg(test)]
#[path = "verdict_tests.rs"]
mod tests;
