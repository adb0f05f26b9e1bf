//! MedLens runtime configuration schema.
//!
//! Every section and field is optional in the YAML file; [`crate::apply_all_defaults`]
//! fills in the gaps and the accessors below resolve what is still missing.

use serde::{Deserialize, Serialize};

use crate::defaults::*;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration, loaded from `config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedLensConfig {
    /// Vision model provider used for identification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,

    /// Public drug label database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup: Option<LookupConfig>,

    /// Capture wizard behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan: Option<ScanConfig>,

    /// Local key-value store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreConfig>,

    /// Lookup proxy server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// "openai" | "gemini"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Override for OpenAI-compatible gateways or tests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Fallback credential when none is saved in the local store (usually `${OPENAI_API_KEY}`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Language the model should answer in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Optional openFDA key; raises the anonymous rate limit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Ordered capture step labels; the wizard requires one confirmed photo per step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
    /// Cold start policy: "resume" | "discard"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    /// Finalization pipeline: "label" | "guidance"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_edge: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// SQLite file; relative paths resolve against the config directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Log level (trace | debug | info | warn | error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for rolling JSON log files; console only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved accessors
// ---------------------------------------------------------------------------

impl MedLensConfig {
    pub fn provider_kind(&self) -> String {
        self.provider.as_ref().and_then(|p| p.kind.clone()).unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    /// Configured model, or the default for the configured provider kind.
    pub fn provider_model(&self) -> String {
        if let Some(model) = self.provider.as_ref().and_then(|p| p.model.clone()) {
            return model;
        }
        match self.provider_kind().as_str() {
            "gemini" => DEFAULT_GEMINI_MODEL.to_string(),
            _ => DEFAULT_OPENAI_MODEL.to_string(),
        }
    }

    pub fn provider_base_url(&self) -> Option<String> {
        self.provider.as_ref().and_then(|p| p.base_url.clone())
    }

    /// Credential from the config file; blank counts as unset.
    pub fn provider_api_key(&self) -> Option<String> {
        self.provider
            .as_ref()
            .and_then(|p| p.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn provider_timeout_secs(&self) -> u64 {
        self.provider.as_ref().and_then(|p| p.timeout_secs).unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS)
    }

    pub fn language(&self) -> String {
        self.provider.as_ref().and_then(|p| p.language.clone()).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    pub fn lookup_base_url(&self) -> String {
        self.lookup.as_ref().and_then(|l| l.base_url.clone()).unwrap_or_else(|| DEFAULT_LOOKUP_BASE_URL.to_string())
    }

    pub fn lookup_api_key(&self) -> Option<String> {
        self.lookup
            .as_ref()
            .and_then(|l| l.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn lookup_timeout_secs(&self) -> u64 {
        self.lookup.as_ref().and_then(|l| l.timeout_secs).unwrap_or(DEFAULT_LOOKUP_TIMEOUT_SECS)
    }

    pub fn steps(&self) -> Vec<String> {
        self.scan
            .as_ref()
            .and_then(|s| s.steps.clone())
            .unwrap_or_else(|| DEFAULT_STEPS.iter().map(|s| s.to_string()).collect())
    }

    pub fn resume_policy(&self) -> String {
        self.scan.as_ref().and_then(|s| s.resume.clone()).unwrap_or_else(|| DEFAULT_RESUME_POLICY.to_string())
    }

    pub fn variant(&self) -> String {
        self.scan.as_ref().and_then(|s| s.variant.clone()).unwrap_or_else(|| DEFAULT_VARIANT.to_string())
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.scan.as_ref().and_then(|s| s.confidence_threshold).unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD)
    }

    pub fn max_edge(&self) -> u32 {
        self.scan.as_ref().and_then(|s| s.max_edge).unwrap_or(DEFAULT_MAX_EDGE)
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.scan.as_ref().and_then(|s| s.jpeg_quality).unwrap_or(DEFAULT_JPEG_QUALITY)
    }

    pub fn store_path(&self) -> String {
        self.store.as_ref().and_then(|s| s.path.clone()).unwrap_or_else(|| DEFAULT_STORE_FILE.to_string())
    }

    pub fn gateway_bind(&self) -> String {
        self.gateway.as_ref().and_then(|g| g.bind.clone()).unwrap_or_else(|| DEFAULT_GATEWAY_BIND.to_string())
    }

    pub fn gateway_port(&self) -> u16 {
        self.gateway.as_ref().and_then(|g| g.port).unwrap_or(DEFAULT_GATEWAY_PORT)
    }

    pub fn log_dir(&self) -> Option<String> {
        self.logging.as_ref().and_then(|l| l.dir.clone())
    }

    pub fn log_level(&self) -> String {
        self.logging.as_ref().and_then(|l| l.level.clone()).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }
}
