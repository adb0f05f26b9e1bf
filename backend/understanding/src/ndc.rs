//! National Drug Code recognition in free text.

use once_cell::sync::Lazy;
use regex::Regex;

/// 10-digit NDCs in the 4-4-2, 5-3-2 and 5-4-1 layouts, plus the 11-digit 5-4-2 billing form.
static NDC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{4}-\d{4}-\d{2}|\d{5}-\d{3}-\d{2}|\d{5}-\d{4}-\d{1,2})\b").unwrap()
});

/// First NDC-shaped token in `text`.
pub fn find_ndc(text: &str) -> Option<String> {
    NDC_RE.find(text).map(|m| m.as_str().to_string())
}

/// Whether `code` looks like a printed NDC.
pub fn is_ndc(code: &str) -> bool {
    NDC_RE.find(code.trim()).is_some_and(|m| m.as_str().len() == code.trim().len())
}

/// Strip the leading "NDC" label and whitespace models sometimes keep.
pub fn clean_ndc(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_label = trimmed
        .strip_prefix("NDC")
        .or_else(|| trimmed.strip_prefix("ndc"))
        .unwrap_or(trimmed);
    without_label.trim_start_matches([':', '#', ' ']).trim().to_string()
}
