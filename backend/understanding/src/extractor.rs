//! [`IdentityExtractor`] backed by a vision LLM.

use std::time::Duration;

use async_trait::async_trait;
use medlens_core::{GuidanceRecord, IdentityExtractor, IdentityRecord, ImagePayload, MedLensError};
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::json_repair::parse_json_object;
use crate::ndc::{clean_ndc, find_ndc, is_ndc};
use crate::vision::{build_client, complete_with_images, VisionProvider};

pub struct VisionExtractor {
    client: Client,
    provider: VisionProvider,
}

impl VisionExtractor {
    pub fn new(provider: VisionProvider, timeout: Duration) -> Result<Self, MedLensError> {
        let client = build_client(timeout).map_err(|e| MedLensError::Configuration(format!("{e:#}")))?;
        Ok(Self { client, provider })
    }

    async fn ask(&self, images: &[ImagePayload], instruction: &str) -> Result<Value, MedLensError> {
        let raw = complete_with_images(&self.client, &self.provider, images, instruction)
            .await
            .map_err(|e| MedLensError::Extraction(format!("{e:#}")))?;
        let map = parse_json_object(&raw).map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Unparsable model answer");
            MedLensError::Extraction(format!("{e:#}"))
        })?;
        Ok(Value::Object(map))
    }
}

/// Keep `ndc` only if it holds a real NDC, else look for one in the free-text fields.
fn recover_ndc(record: &mut IdentityRecord) {
    let printed = record.ndc.take().and_then(|raw| {
        let cleaned = clean_ndc(&raw);
        if is_ndc(&cleaned) { Some(cleaned) } else { find_ndc(&cleaned) }
    });
    record.ndc = printed.or_else(|| record.extra.values().filter_map(Value::as_str).find_map(find_ndc));
}

#[async_trait]
impl IdentityExtractor for VisionExtractor {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn extract(&self, images: &[ImagePayload], instruction: &str) -> Result<IdentityRecord, MedLensError> {
        let value = self.ask(images, instruction).await?;
        let mut record = IdentityRecord::from_value(&value);
        recover_ndc(&mut record);
        info!(
            provider = self.provider.name(),
            has_ndc = record.ndc.is_some(),
            has_name = record.has_name(),
            confidence = record.confidence.unwrap_or(-1.0),
            "Identity extracted"
        );
        Ok(record)
    }

    async fn guidance(&self, images: &[ImagePayload], instruction: &str) -> Result<GuidanceRecord, MedLensError> {
        let value = self.ask(images, instruction).await?;
        let record = GuidanceRecord::from_value(&value);
        info!(provider = self.provider.name(), named = record.drug_name.is_some(), "Guidance received");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use serde_json::json;
    use tokio::net::TcpListener;

    /// Serve a fixed OpenAI-style chat completion answer on a random local port.
    async fn fake_openai(answer: &'static str, status: u16) -> String {
        let app = Router::new().route(
            "/chat/completions",
            post(move |Json(body): Json<Value>| async move {
                // Every capture is sent as its own image part after the instruction.
                let parts = body["messages"][0]["content"].as_array().map(Vec::len).unwrap_or(0);
                assert_eq!(parts, 3);
                (
                    axum::http::StatusCode::from_u16(status).unwrap(),
                    Json(json!({ "choices": [{ "message": { "content": answer } }] })),
                )
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn images() -> Vec<ImagePayload> {
        vec![ImagePayload::new("image/jpeg", vec![1, 2, 3]), ImagePayload::new("image/jpeg", vec![4, 5, 6])]
    }

    fn extractor(base: String) -> VisionExtractor {
        let provider = VisionProvider::openai("sk-test", "gpt-4o-mini").with_base_url(base);
        VisionExtractor::new(provider, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn extracts_fenced_identity() {
        let base = fake_openai(
            "```json\n{\"brand_name\":\"Advil\",\"ndc\":\"NDC 0573-0164-30\",\"confidence\":0.9}\n```",
            200,
        )
        .await;
        let record = extractor(base).extract(&images(), "identify").await.unwrap();
        assert_eq!(record.brand_name.as_deref(), Some("Advil"));
        assert_eq!(record.ndc.as_deref(), Some("0573-0164-30"));
        assert_eq!(record.confidence, Some(0.9));
    }

    #[test]
    fn ndc_embedded_in_field_is_isolated() {
        let mut record = IdentityRecord { ndc: Some("NDC 0573-0164-30 (100 ct)".into()), ..Default::default() };
        recover_ndc(&mut record);
        assert_eq!(record.ndc.as_deref(), Some("0573-0164-30"));
    }

    #[test]
    fn unreadable_ndc_is_dropped() {
        let mut record = IdentityRecord {
            ndc: Some("see side panel".into()),
            brand_name: Some("Advil".into()),
            ..Default::default()
        };
        recover_ndc(&mut record);
        assert_eq!(record.ndc, None);
        assert!(record.has_name());
    }

    #[test]
    fn unreadable_ndc_falls_back_to_free_text() {
        let mut record = IdentityRecord { ndc: Some("illegible".into()), ..Default::default() };
        record.extra.insert("label_text".into(), Value::String("NDC 0093-7146-56 Rx only".into()));
        recover_ndc(&mut record);
        assert_eq!(record.ndc.as_deref(), Some("0093-7146-56"));
    }

    #[tokio::test]
    async fn recovers_ndc_from_free_text() {
        let base = fake_openai("{\"label_text\":\"Rx only NDC 0093-7146-56\"}", 200).await;
        let record = extractor(base).extract(&images(), "identify").await.unwrap();
        assert_eq!(record.ndc.as_deref(), Some("0093-7146-56"));
    }

    #[tokio::test]
    async fn prose_answer_is_extraction_error() {
        let base = fake_openai("I cannot read this label.", 200).await;
        let err = extractor(base).extract(&images(), "identify").await.unwrap_err();
        assert!(matches!(err, MedLensError::Extraction(_)));
    }

    #[tokio::test]
    async fn http_error_is_extraction_error() {
        let base = fake_openai("{}", 500).await;
        let err = extractor(base).extract(&images(), "identify").await.unwrap_err();
        assert!(matches!(err, MedLensError::Extraction(_)));
    }

    #[tokio::test]
    async fn unreachable_provider_is_extraction_error() {
        let err = extractor("http://127.0.0.1:1".into()).extract(&images(), "identify").await.unwrap_err();
        assert!(matches!(err, MedLensError::Extraction(_)));
    }

    #[tokio::test]
    async fn guidance_is_parsed() {
        let base = fake_openai("{\"drug_name\":\"Zyrtec\",\"dosage\":\"10 mg once daily\",\"confidence\":0.8}", 200).await;
        let record = extractor(base).guidance(&images(), "guide").await.unwrap();
        assert_eq!(record.drug_name.as_deref(), Some("Zyrtec"));
        assert_eq!(record.dosage.as_deref(), Some("10 mg once daily"));
    }
}
