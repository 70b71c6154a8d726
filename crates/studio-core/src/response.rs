//! Response unwrapping
//!
//! Upstream model runtimes answer in several shapes. A response is broken
//! into candidates, which are tried in a fixed priority order:
//!
//! 1. a structured object under `json`
//! 2. serialized text under `output`
//! 3. serialized text under `text`
//! 4. the whole response, when it is a mapping
//!
//! The first candidate that yields a mapping wins. Tolerant parsing never
//! fails; an unparseable text candidate is skipped.

use crate::error::InvocationError;
use crate::types::StageOutput;
use serde_json::Value;

/// Message used when no candidate produced a mapping
pub const UNPARSEABLE_RESPONSE: &str = "Wrapper response did not include a parseable JSON object";

/// Text fields tried in order
pub const TEXT_FIELDS: [&str; 2] = ["output", "text"];

/// Limit on balanced-brace salvage candidates per text
const MAX_SALVAGE_CANDIDATES: usize = 4;

/// One way of reading an upstream response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseCandidate {
    /// Already-structured object under a known field
    Structured(StageOutput),
    /// Text that may hold serialized structured data
    RawText {
        /// Field the text came from
        field: &'static str,
        /// Raw text
        text: String,
    },
    /// The whole response as a plain mapping
    RawMapping(StageOutput),
}

impl ResponseCandidate {
    /// Mapping produced by this candidate, if any
    #[must_use]
    pub fn into_output(self) -> Option<StageOutput> {
        match self {
            ResponseCandidate::Structured(map) | ResponseCandidate::RawMapping(map) => Some(map),
            ResponseCandidate::RawText { text, .. } => tolerant_parse(&text),
        }
    }
}

/// Result of unwrapping a response
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// A candidate produced a mapping
    Resolved(StageOutput),
    /// No candidate produced a mapping
    ParseFailure,
}

impl Unwrapped {
    /// Convert into an invocation result
    pub fn into_result(self) -> Result<StageOutput, InvocationError> {
        match self {
            Unwrapped::Resolved(output) => Ok(output),
            Unwrapped::ParseFailure => {
                Err(InvocationError::Unparseable(UNPARSEABLE_RESPONSE.to_string()))
            }
        }
    }
}

/// Candidates of a response, in priority order
#[must_use]
pub fn candidates(response: &Value) -> Vec<ResponseCandidate> {
    let mut out = Vec::new();
    let Some(map) = response.as_object() else {
        return out;
    };
    if let Some(Value::Object(structured)) = map.get("json") {
        out.push(ResponseCandidate::Structured(structured.clone()));
    }
    for field in TEXT_FIELDS {
        if let Some(Value::String(text)) = map.get(field) {
            out.push(ResponseCandidate::RawText {
                field,
                text: text.clone(),
            });
        }
    }
    out.push(ResponseCandidate::RawMapping(map.clone()));
    out
}

/// Unwrap a response by trying each candidate in order
#[must_use]
pub fn unwrap_response(response: &Value) -> Unwrapped {
    candidates(response)
        .into_iter()
        .find_map(ResponseCandidate::into_output)
        .map_or(Unwrapped::ParseFailure, Unwrapped::Resolved)
}

/// Unwrap a response into stage output
pub fn resolve(response: &Value) -> Result<StageOutput, InvocationError> {
    unwrap_response(response).into_result()
}

/// Parse text that may hold a JSON object
///
/// Tries the text as-is, then with markdown fences removed, then up to
/// [`MAX_SALVAGE_CANDIDATES`] balanced `{...}` blocks from each of those,
/// shallowest first. Runs in time linear in the text length. Returns `None`
/// when nothing parses to an object.
#[must_use]
pub fn tolerant_parse(text: &str) -> Option<StageOutput> {
    let mut attempts = Vec::new();
    push_unique(&mut attempts, text);
    if let Some(stripped) = strip_markdown_fences(text) {
        push_unique(&mut attempts, stripped);
    }
    let sources = attempts.len();
    for idx in 0..sources {
        let source = attempts[idx].clone();
        for block in balanced_objects(&source, MAX_SALVAGE_CANDIDATES) {
            push_unique(&mut attempts, block);
        }
    }
    attempts
        .iter()
        .find_map(|attempt| match serde_json::from_str::<Value>(attempt) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        })
}

fn push_unique(attempts: &mut Vec<String>, candidate: impl Into<String>) {
    let candidate = candidate.into();
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return;
    }
    if !attempts.iter().any(|existing| existing == trimmed) {
        attempts.push(trimmed.to_string());
    }
}

fn strip_markdown_fences(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let without_open = trimmed.strip_prefix("```")?;
    let body = match without_open.find('\n') {
        Some(newline) => &without_open[newline + 1..],
        None => without_open,
    };
    let end = body.rfind("```")?;
    Some(body[..end].trim().to_string())
}

/// Balanced `{...}` blocks, shallowest first, then by position
///
/// One pass with a stack of open braces; braces inside strings are ignored.
/// Unclosed braces never yield a block, so nested blocks inside an
/// unbalanced outer object are still found.
fn balanced_objects(text: &str, max: usize) -> Vec<String> {
    let mut open: Vec<usize> = Vec::new();
    let mut spans: Vec<(usize, usize, usize)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => open.push(idx),
            '}' => {
                if let Some(start) = open.pop() {
                    spans.push((open.len(), start, idx + ch.len_utf8()));
                }
            }
            _ => {}
        }
    }
    spans.sort_unstable();
    let mut out = Vec::new();
    for (_, start, end) in spans {
        if out.len() >= max {
            break;
        }
        push_unique(&mut out, &text[start..end]);
    }
    out
}
