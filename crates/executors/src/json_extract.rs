// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental extraction of top-level JSON objects from a byte stream.
//!
//! Agent CLIs interleave JSON records with banner text, progress noise,
//! and ANSI decoration. This extractor identifies complete top-level
//! objects by brace-depth counting with string-literal and escape
//! awareness; everything between objects is surfaced as text segments at
//! newline boundaries. Input arrives in arbitrary chunks: objects and
//! lines may span pushes.

use serde_json::Value;

/// One extracted item.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    /// A complete, parseable top-level JSON object
    Object(Value),
    /// Text outside objects (one segment per line, newline not included)
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Text,
    Object {
        depth: u32,
        in_string: bool,
        escaped: bool,
    },
}

/// Streaming extractor. Feed bytes with [`push`](JsonExtractor::push);
/// call [`finish`](JsonExtractor::finish) at end of stream.
pub struct JsonExtractor {
    buf: Vec<u8>,
    mode: Mode,
    /// Unterminated-object guard: past this size the candidate is flushed
    /// as text so a brace in prose cannot buffer the stream forever.
    max_object_bytes: usize,
}

impl Default for JsonExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonExtractor {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            mode: Mode::Text,
            max_object_bytes: 1 << 20,
        }
    }

    /// Feed a chunk, returning everything completed by it.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Extracted> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();

        // `start` is the beginning of the current segment (text or object
        // candidate) inside `buf`; `pos` is the scan cursor.
        let mut start = 0usize;
        let mut pos = match self.mode {
            // Resume scanning where the previous push left off: for text
            // we rescan the held tail (cheap, it has no newline), for an
            // object candidate the mode carries the string state,
            // so we continue at the end.
            Mode::Text => 0,
            Mode::Object { .. } => self.buf.len() - bytes.len(),
        };

        while pos < self.buf.len() {
            let b = self.buf[pos];
            match self.mode {
                Mode::Text => {
                    if b == b'{' {
                        flush_text(&self.buf[start..pos], &mut out);
                        start = pos;
                        self.mode = Mode::Object {
                            depth: 0,
                            in_string: false,
                            escaped: false,
                        };
                        // Re-handle this byte in object mode.
                        continue;
                    }
                    if b == b'\n' {
                        flush_text(&self.buf[start..pos], &mut out);
                        start = pos + 1;
                    }
                    pos += 1;
                }
                Mode::Object {
                    mut depth,
                    mut in_string,
                    mut escaped,
                } => {
                    if in_string {
                        if escaped {
                            escaped = false;
                        } else if b == b'\\' {
                            escaped = true;
                        } else if b == b'"' {
                            in_string = false;
                        }
                    } else {
                        match b {
                            b'"' => in_string = true,
                            b'{' => depth += 1,
                            b'}' => {
                                depth -= 1;
                                if depth == 0 {
                                    out.push(parse_candidate(&self.buf[start..=pos]));
                                    start = pos + 1;
                                    self.mode = Mode::Text;
                                    pos += 1;
                                    continue;
                                }
                            }
                            _ => {}
                        }
                    }
                    self.mode = Mode::Object {
                        depth,
                        in_string,
                        escaped,
                    };
                    pos += 1;

                    if pos - start > self.max_object_bytes {
                        // Not JSON after all; degrade to text.
                        flush_text(&self.buf[start..pos], &mut out);
                        start = pos;
                        self.mode = Mode::Text;
                    }
                }
            }
        }

        self.buf.drain(..start);
        out
    }

    /// Flush whatever remains at end of stream.
    pub fn finish(&mut self) -> Vec<Extracted> {
        let mut out = Vec::new();
        if !self.buf.is_empty() {
            match self.mode {
                // A truncated object is still worth showing as text.
                Mode::Object { .. } | Mode::Text => flush_text(&self.buf, &mut out),
            }
        }
        self.buf.clear();
        self.mode = Mode::Text;
        out
    }
}

fn flush_text(bytes: &[u8], out: &mut Vec<Extracted>) {
    if bytes.is_empty() {
        return;
    }
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end_matches('\n');
    if !trimmed.trim().is_empty() {
        out.push(Extracted::Text(trimmed.to_string()));
    }
}

/// Parse a brace-balanced candidate; unparseable candidates degrade to
/// text rather than aborting the stream.
fn parse_candidate(bytes: &[u8]) -> Extracted {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => Extracted::Object(value),
        Err(_) => Extracted::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

#[cfg(test)]
#[path = "json_extract_tests.rs"]
mod tests;
