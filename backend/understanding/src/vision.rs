/// Vision completion: send package photos plus an instruction to a vision LLM.
///
/// All images go in a single request, in capture order. Both providers are asked
/// for a JSON response body; parsing happens in [`crate::json_repair`].
use std::time::Duration;

use anyhow::{bail, Context, Result};
use medlens_core::ImagePayload;
use reqwest::Client;
use tracing::{debug, info};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Supported vision providers.
#[derive(Debug, Clone)]
pub enum VisionProvider {
    OpenAI { api_key: String, model: String, base_url: String },
    Gemini { api_key: String, model: String, base_url: String },
}

impl VisionProvider {
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::OpenAI { api_key: api_key.into(), model: model.into(), base_url: OPENAI_BASE_URL.to_string() }
    }

    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::Gemini { api_key: api_key.into(), model: model.into(), base_url: GEMINI_BASE_URL.to_string() }
    }

    /// Build from a config `kind` string ("openai" | "gemini").
    pub fn from_kind(kind: &str, api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        match kind {
            "openai" => Ok(Self::openai(api_key, model)),
            "gemini" => Ok(Self::gemini(api_key, model)),
            other => bail!("unknown vision provider '{other}'"),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        match &mut self {
            Self::OpenAI { base_url, .. } | Self::Gemini { base_url, .. } => *base_url = url.into(),
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Gemini { .. } => "gemini",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::OpenAI { model, .. } | Self::Gemini { model, .. } => model,
        }
    }
}

/// HTTP client with a whole-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder().timeout(timeout).build().context("Failed to build HTTP client")
}

/// Send `images` and `prompt` to the provider and return the raw text answer.
pub async fn complete_with_images(
    client: &Client,
    provider: &VisionProvider,
    images: &[ImagePayload],
    prompt: &str,
) -> Result<String> {
    if images.is_empty() {
        bail!("no images to send");
    }
    match provider {
        VisionProvider::OpenAI { api_key, model, base_url } => {
            complete_via_openai(client, api_key, model, base_url, images, prompt).await
        }
        VisionProvider::Gemini { api_key, model, base_url } => {
            complete_via_gemini(client, api_key, model, base_url, images, prompt).await
        }
    }
}

async fn complete_via_openai(
    client: &Client, api_key: &str, model: &str, base_url: &str, images: &[ImagePayload], prompt: &str,
) -> Result<String> {
    info!(model, images = images.len(), "[Vision] Sending capture set to OpenAI");
    let mut content = vec![serde_json::json!({ "type": "text", "text": prompt })];
    content.extend(images.iter().map(|img| {
        serde_json::json!({ "type": "image_url", "image_url": { "url": img.to_data_url(), "detail": "high" } })
    }));
    let body = serde_json::json!({
        "model": model,
        "messages": [{ "role": "user", "content": content }],
        "max_tokens": MAX_OUTPUT_TOKENS,
        "temperature": 0,
        "response_format": { "type": "json_object" }
    });

    let resp = client
        .post(format!("{}/chat/completions", base_url.trim_end_matches('/')))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .context("OpenAI request failed")?;
    let status = resp.status();
    if !status.is_success() {
        bail!("OpenAI vision error {}: {}", status, resp.text().await.unwrap_or_default());
    }
    let json: serde_json::Value = resp.json().await.context("Failed to parse OpenAI response")?;
    let text = json["choices"][0]["message"]["content"]
        .as_str()
        .context("OpenAI response has no message content")?;
    debug!(chars = text.len(), "[Vision] OpenAI answered");
    Ok(text.to_string())
}

async fn complete_via_gemini(
    client: &Client, api_key: &str, model: &str, base_url: &str, images: &[ImagePayload], prompt: &str,
) -> Result<String> {
    info!(model, images = images.len(), "[Vision] Sending capture set to Gemini");
    let mut parts = vec![serde_json::json!({ "text": prompt })];
    parts.extend(images.iter().map(|img| {
        serde_json::json!({ "inlineData": { "mimeType": img.mime_type, "data": img.base64() } })
    }));
    let body = serde_json::json!({
        "contents": [{ "parts": parts }],
        "generationConfig": { "temperature": 0, "responseMimeType": "application/json" }
    });

    let url = format!("{}/v1beta/models/{}:generateContent", base_url.trim_end_matches('/'), model);
    let resp = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .context("Gemini request failed")?;
    let status = resp.status();
    if !status.is_success() {
        bail!("Gemini vision error {}: {}", status, resp.text().await.unwrap_or_default());
    }
    let json: serde_json::Value = resp.json().await.context("Failed to parse Gemini response")?;
    let text = json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .context("Gemini response has no text part")?;
    debug!(chars = text.len(), "[Vision] Gemini answered");
    Ok(text.to_string())
}
