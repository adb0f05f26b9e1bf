//! Config validation: schema checks with user-friendly error messages.

use crate::schema::MedLensConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &MedLensConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_provider(config, &mut report);
    validate_scan(config, &mut report);
    validate_gateway(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_provider(config: &MedLensConfig, report: &mut ValidationReport) {
    let Some(provider) = &config.provider else { return };
    if let Some(kind) = &provider.kind {
        if !matches!(kind.as_str(), "openai" | "gemini") {
            report.error("provider.kind", format!("Unknown provider '{kind}'. Use 'openai' or 'gemini'"));
        }
    }
    if provider.timeout_secs == Some(0) {
        report.error("provider.timeoutSecs", "timeoutSecs must be > 0");
    }
    if let Some(url) = &provider.base_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            report.error("provider.baseUrl", "baseUrl must be an http(s) URL");
        }
    }
}

fn validate_scan(config: &MedLensConfig, report: &mut ValidationReport) {
    let Some(scan) = &config.scan else { return };
    if let Some(steps) = &scan.steps {
        if steps.is_empty() {
            report.error("scan.steps", "At least one capture step is required");
        }
        if steps.iter().any(|s| s.trim().is_empty()) {
            report.error("scan.steps", "Step labels cannot be empty");
        }
    }
    if let Some(policy) = &scan.resume {
        if !matches!(policy.as_str(), "resume" | "discard") {
            report.error("scan.resume", format!("Unknown resume policy '{policy}'. Use 'resume' or 'discard'"));
        }
    }
    if let Some(variant) = &scan.variant {
        if !matches!(variant.as_str(), "label" | "guidance") {
            report.error("scan.variant", format!("Unknown variant '{variant}'. Use 'label' or 'guidance'"));
        }
    }
    if let Some(t) = scan.confidence_threshold {
        if !(0.0..=1.0).contains(&t) {
            report.error("scan.confidenceThreshold", "confidenceThreshold must be within [0, 1]");
        }
    }
    if let Some(edge) = scan.max_edge {
        if edge < 64 {
            report.error("scan.maxEdge", "maxEdge must be at least 64 pixels");
        } else if edge > 4096 {
            report.warn("scan.maxEdge", "maxEdge above 4096 makes uploads slow and may exceed provider limits");
        }
    }
    if let Some(q) = scan.jpeg_quality {
        if q == 0 || q > 100 {
            report.error("scan.jpegQuality", "jpegQuality must be within 1..=100");
        }
    }
}

fn validate_gateway(config: &MedLensConfig, report: &mut ValidationReport) {
    let Some(gw) = &config.gateway else { return };
    if let Some(port) = gw.port {
        if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "gateway.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}

fn validate_logging(config: &MedLensConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else { return };
    if !matches!(level, "trace" | "debug" | "info" | "warn" | "error") {
        report.warn("logging.level", format!("Unrecognized log level '{level}'; falling back to filter syntax"));
    }
}
