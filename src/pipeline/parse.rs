//! JSON extraction from free-form model output.
//!
//! Models asked for "strict JSON only" still wrap it in prose or code
//! fences now and then. Extraction runs in two passes:
//!
//! 1. **Strict** — the whole payload (minus an outer ```` ```json ```` fence)
//!    parsed as a JSON object.
//! 2. **Brace scan** — the inclusive substring from the first `{` to the last
//!    `}` parsed as a JSON object.
//!
//! The brace scan is a heuristic: if the explanation itself contains braces
//! (set notation, code) the substring may not be the intended object. Pass 1
//! catches the common well-formed case before the heuristic runs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;

/// Why no object could be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The payload has no `{`, no `}`, or the last `}` precedes the first `{`.
    NoDelimiters,
    /// The brace-delimited substring is not a JSON object.
    InvalidJson(String),
    /// An object was found but it lacks a `topic` key.
    MissingTopic,
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::NoDelimiters => f.write_str("no JSON object delimiters in response"),
            ExtractError::InvalidJson(e) => write!(f, "invalid JSON: {e}"),
            ExtractError::MissingTopic => f.write_str("JSON object has no \"topic\" key"),
        }
    }
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*?)\n?```$").expect("valid regex"));

/// Extract the first plausible JSON object from `raw`.
///
/// With `require_topic`, an object without a `topic` key is rejected even if
/// it parsed.
pub fn extract_object(raw: &str, require_topic: bool) -> Result<Map<String, Value>, ExtractError> {
    let obj = strict_object(raw).map_or_else(|| brace_object(raw), Ok)?;
    if require_topic && !obj.contains_key("topic") {
        return Err(ExtractError::MissingTopic);
    }
    Ok(obj)
}

/// Pass 1: whole payload, tolerating one outer code fence.
fn strict_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    let body = RE_OUTER_FENCE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map_or(trimmed, |m| m.as_str());
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(obj)) => Some(obj),
        _ => None,
    }
}

/// Pass 2: first `{` through last `}`.
fn brace_object(raw: &str) -> Result<Map<String, Value>, ExtractError> {
    let slice = brace_slice(raw).ok_or(ExtractError::NoDelimiters)?;
    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(ExtractError::InvalidJson(format!(
            "expected an object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ExtractError::InvalidJson(e.to_string())),
    }
}

/// The inclusive `{ … }` span, if both delimiters exist in order.
pub fn brace_slice(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
