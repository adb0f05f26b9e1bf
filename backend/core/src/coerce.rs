//! Coercion of loosely-typed provider JSON into optional typed fields.

use serde_json::Value;

/// Values models emit when they could not read a field.
const PLACEHOLDERS: &[&str] = &["", "unknown", "n/a", "na", "none", "null", "not visible", "-"];

/// Coerce a JSON value into a trimmed, non-placeholder string.
pub(crate) fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(trimmed)) {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text).collect();
            if parts.is_empty() { None } else { Some(parts.join(", ")) }
        }
        Value::Null | Value::Object(_) => None,
    }
}

/// Coerce a JSON value into a list of strings. Strings are split on `,` and `;`.
pub(crate) fn list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        Value::String(s) => s
            .split([',', ';'])
            .filter_map(|part| text(&Value::String(part.to_string())))
            .collect(),
        other => text(other).into_iter().collect(),
    }
}

/// Coerce a confidence score into `[0, 1]`. Percentages (1, 100] are rescaled.
pub(crate) fn confidence(value: &Value) -> Option<f64> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    let scaled = if raw > 1.0 && raw <= 100.0 { raw / 100.0 } else { raw };
    Some(scaled.clamp(0.0, 1.0))
}

/// Look up the first present key among aliases.
pub(crate) fn first<'a>(map: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| map.get(*k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholders_become_absent() {
        assert_eq!(text(&json!("Unknown")), None);
        assert_eq!(text(&json!("  ")), None);
        assert_eq!(text(&json!(" Tylenol ")), Some("Tylenol".to_string()));
    }

    #[test]
    fn numbers_become_text() {
        assert_eq!(text(&json!(500)), Some("500".to_string()));
    }

    #[test]
    fn list_splits_strings() {
        assert_eq!(list(&json!("acetaminophen; caffeine")), vec!["acetaminophen", "caffeine"]);
        assert_eq!(list(&json!(["a", null, "b"])), vec!["a", "b"]);
    }

    #[test]
    fn confidence_rescales_percentages() {
        assert_eq!(confidence(&json!(85)), Some(0.85));
        assert_eq!(confidence(&json!("40%")), Some(0.4));
        assert_eq!(confidence(&json!(0.3)), Some(0.3));
        assert_eq!(confidence(&json!(-2)), Some(0.0));
        assert_eq!(confidence(&json!("high")), None);
    }
}
