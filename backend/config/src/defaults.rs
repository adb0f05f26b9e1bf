//! Config defaults: applies sensible default values to parsed config.

use crate::schema::{LoggingConfig, MedLensConfig, ProviderConfig, ScanConfig};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LANGUAGE: &str = "English";

pub const DEFAULT_LOOKUP_BASE_URL: &str = "https://api.fda.gov";
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 15;

pub const DEFAULT_STEPS: &[&str] = &["front of package", "back of package"];
pub const DEFAULT_RESUME_POLICY: &str = "resume";
pub const DEFAULT_VARIANT: &str = "label";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.4;

/// Long-edge bound for normalized captures, in pixels.
pub const DEFAULT_MAX_EDGE: u32 = 1024;
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

pub const DEFAULT_STORE_FILE: &str = "medlens.db";
pub const DEFAULT_GATEWAY_BIND: &str = "127.0.0.1";
pub const DEFAULT_GATEWAY_PORT: u16 = 8787;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: MedLensConfig) -> MedLensConfig {
    let config = apply_provider_defaults(config);
    let config = apply_scan_defaults(config);
    apply_logging_defaults(config)
}

/// Provider kind and a model matching it.
fn apply_provider_defaults(mut config: MedLensConfig) -> MedLensConfig {
    let provider = config.provider.get_or_insert_with(ProviderConfig::default);
    let kind = provider.kind.get_or_insert_with(|| DEFAULT_PROVIDER.to_string()).clone();
    if provider.model.is_none() {
        let model = if kind == "gemini" { DEFAULT_GEMINI_MODEL } else { DEFAULT_OPENAI_MODEL };
        provider.model = Some(model.to_string());
    }
    config
}

fn apply_scan_defaults(mut config: MedLensConfig) -> MedLensConfig {
    let scan = config.scan.get_or_insert_with(ScanConfig::default);
    if scan.steps.is_none() {
        scan.steps = Some(DEFAULT_STEPS.iter().map(|s| s.to_string()).collect());
    }
    if scan.resume.is_none() {
        scan.resume = Some(DEFAULT_RESUME_POLICY.to_string());
    }
    if scan.variant.is_none() {
        scan.variant = Some(DEFAULT_VARIANT.to_string());
    }
    config
}

fn apply_logging_defaults(mut config: MedLensConfig) -> MedLensConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemini_gets_gemini_model() {
        let mut cfg = MedLensConfig::default();
        cfg.provider = Some(ProviderConfig { kind: Some("gemini".into()), ..Default::default() });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.provider.unwrap().model.as_deref(), Some(DEFAULT_GEMINI_MODEL));
    }

    #[test]
    fn explicit_values_survive() {
        let mut cfg = MedLensConfig::default();
        cfg.scan = Some(ScanConfig { resume: Some("discard".into()), ..Default::default() });
        let cfg = apply_all_defaults(cfg);
        let scan = cfg.scan.unwrap();
        assert_eq!(scan.resume.as_deref(), Some("discard"));
        assert_eq!(scan.steps.unwrap().len(), 2);
    }
}
