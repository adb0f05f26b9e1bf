//! Local repair of model output before JSON parsing.
//!
//! Models often wrap JSON in Markdown code fences even when asked not to.
//! Only fences are stripped; anything else that fails to parse is an error.

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};

/// Strip an optional surrounding ``` or ```json fence.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening line.
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse model output as a JSON object after fence stripping.
pub fn parse_json_object(raw: &str) -> Result<Map<String, Value>> {
    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        bail!("model returned an empty answer");
    }
    let value: Value = serde_json::from_str(cleaned).context("model answer is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("expected a JSON object, got {}", kind(&other)),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
