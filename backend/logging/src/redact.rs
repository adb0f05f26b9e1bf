//! Log Redaction Layer
//!
//! Scrubs provider API keys, bearer tokens, and inline image payloads from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(sk-[a-zA-Z0-9_\-]{20,})|(AIza[0-9A-Za-z_\-]{35})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)").unwrap()
});
static KEY_PARAM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([?&](?:key|api_key)=)[^&\s]+").unwrap());
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"data:([a-z]+/[a-z0-9.+\-]+);base64,[A-Za-z0-9+/=]+").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let mut redacted = API_KEY_RE.replace_all(input, "[REDACTED_TOKEN]").to_string();

    // Query-string credentials (Gemini takes the key as `?key=`)
    redacted = KEY_PARAM_RE.replace_all(&redacted, "${1}[REDACTED_TOKEN]").to_string();

    // Image payloads are large and may show personal information on the label
    redacted = DATA_URL_RE.replace_all(&redacted, "data:${1};base64,[REDACTED_IMAGE]").to_string();

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "calling with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9 and sk-abcdefghijklmnopqrstuvwxyz0123";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
        assert!(!clean.contains("sk-abcdefghijklmnopqrstuvwxyz0123"));
    }

    #[test]
    fn redacts_query_key() {
        let clean = redact_sensitive_data("POST https://host/v1beta/models/m:generateContent?key=secret123&alt=json");
        assert!(clean.contains("?key=[REDACTED_TOKEN]&alt=json"));
    }

    #[test]
    fn redacts_image_payloads() {
        let clean = redact_sensitive_data("image data:image/jpeg;base64,/9j/4AAQSkZJRg== attached");
        assert_eq!(clean, "image data:image/jpeg;base64,[REDACTED_IMAGE] attached");
    }
}
