//! Finalization: the work done once every capture step is confirmed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use medlens_core::{DrugLookup, IdentityExtractor, ImagePayload, MedLensError, ScanOutcome, Source};
use medlens_understanding::{fallback_links, render, VisionExtractor, VisionProvider, GUIDANCE_TEMPLATE, IDENTITY_TEMPLATE};
use tracing::info;

/// Builds an extractor bound to the user's credential.
pub trait ExtractorFactory: Send + Sync {
    fn build(&self, credential: &str) -> Result<Arc<dyn IdentityExtractor>, MedLensError>;
}

/// Provider settings for [`VisionExtractor`], minus the key.
#[derive(Debug, Clone)]
pub struct VisionExtractorFactory {
    pub kind: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl ExtractorFactory for VisionExtractorFactory {
    fn build(&self, credential: &str) -> Result<Arc<dyn IdentityExtractor>, MedLensError> {
        let mut provider = VisionProvider::from_kind(&self.kind, credential, &self.model)
            .map_err(|e| MedLensError::Configuration(e.to_string()))?;
        if let Some(url) = &self.base_url {
            provider = provider.with_base_url(url);
        }
        Ok(Arc::new(VisionExtractor::new(provider, self.timeout)?))
    }
}

/// One finalization strategy.
#[async_trait]
pub trait Finalizer: Send + Sync {
    /// "label" | "guidance"
    fn variant(&self) -> &'static str;

    async fn finalize(&self, images: &[ImagePayload], credential: &str) -> Result<ScanOutcome, MedLensError>;
}

fn links_for(query: Option<String>) -> Vec<Source> {
    query.map(|q| fallback_links(&q)).unwrap_or_default()
}

/// Extract identity, then resolve it against the label database.
pub struct LabelLookupPipeline {
    extractors: Arc<dyn ExtractorFactory>,
    lookup: Arc<dyn DrugLookup>,
    language: String,
    threshold: f64,
}

impl LabelLookupPipeline {
    pub fn new(
        extractors: Arc<dyn ExtractorFactory>,
        lookup: Arc<dyn DrugLookup>,
        language: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self { extractors, lookup, language: language.into(), threshold }
    }
}

#[async_trait]
impl Finalizer for LabelLookupPipeline {
    fn variant(&self) -> &'static str {
        "label"
    }

    async fn finalize(&self, images: &[ImagePayload], credential: &str) -> Result<ScanOutcome, MedLensError> {
        let extractor = self.extractors.build(credential)?;
        let instruction = render(IDENTITY_TEMPLATE, &self.language);
        let identity = extractor.extract(images, &instruction).await?;

        let low_confidence = identity.is_low_confidence(self.threshold);
        let lookup = self.lookup.lookup(&identity, identity.barcode.as_deref()).await;
        let fallback = links_for(identity.display_name().or_else(|| identity.ndc.clone()));
        info!(
            provider = extractor.name(),
            found = lookup.is_found(),
            low_confidence,
            "Label pipeline finished"
        );
        Ok(ScanOutcome::Label { identity, lookup, low_confidence, fallback_links: fallback })
    }
}

/// Ask the model for usage guidance directly.
pub struct GuidancePipeline {
    extractors: Arc<dyn ExtractorFactory>,
    language: String,
    threshold: f64,
}

impl GuidancePipeline {
    pub fn new(extractors: Arc<dyn ExtractorFactory>, language: impl Into<String>, threshold: f64) -> Self {
        Self { extractors, language: language.into(), threshold }
    }
}

#[async_trait]
impl Finalizer for GuidancePipeline {
    fn variant(&self) -> &'static str {
        "guidance"
    }

    async fn finalize(&self, images: &[ImagePayload], credential: &str) -> Result<ScanOutcome, MedLensError> {
        let extractor = self.extractors.build(credential)?;
        let instruction = render(GUIDANCE_TEMPLATE, &self.language);
        let guidance = extractor.guidance(images, &instruction).await?;

        let low_confidence = guidance.is_low_confidence(self.threshold);
        let fallback = links_for(
            guidance
                .drug_name
                .clone()
                .or_else(|| guidance.active_ingredients.first().cloned()),
        );
        info!(provider = extractor.name(), low_confidence, "Guidance pipeline finished");
        Ok(ScanOutcome::Guidance { guidance, low_confidence, fallback_links: fallback })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted collaborators shared by the wizard tests.

    use super::*;
    use medlens_core::{GuidanceRecord, IdentityRecord, LookupResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct ScriptedExtractor {
        pub identity: Result<IdentityRecord, String>,
        pub guidance: GuidanceRecord,
        pub seen_images: Mutex<usize>,
    }

    #[async_trait]
    impl IdentityExtractor for ScriptedExtractor {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn extract(&self, images: &[ImagePayload], _: &str) -> Result<IdentityRecord, MedLensError> {
            *self.seen_images.lock().unwrap() = images.len();
            self.identity.clone().map_err(MedLensError::Extraction)
        }

        async fn guidance(&self, images: &[ImagePayload], _: &str) -> Result<GuidanceRecord, MedLensError> {
            *self.seen_images.lock().unwrap() = images.len();
            Ok(self.guidance.clone())
        }
    }

    pub struct FixedFactory {
        pub extractor: Arc<ScriptedExtractor>,
        pub credentials: Mutex<Vec<String>>,
    }

    impl FixedFactory {
        pub fn new(identity: Result<IdentityRecord, String>) -> Arc<Self> {
            Arc::new(Self {
                extractor: Arc::new(ScriptedExtractor {
                    identity,
                    guidance: GuidanceRecord::default(),
                    seen_images: Mutex::new(0),
                }),
                credentials: Mutex::new(Vec::new()),
            })
        }
    }

    impl ExtractorFactory for FixedFactory {
        fn build(&self, credential: &str) -> Result<Arc<dyn IdentityExtractor>, MedLensError> {
            self.credentials.lock().unwrap().push(credential.to_string());
            Ok(self.extractor.clone())
        }
    }

    #[derive(Default)]
    pub struct CountingLookup {
        pub calls: AtomicUsize,
        pub result: Option<LookupResult>,
    }

    #[async_trait]
    impl DrugLookup for CountingLookup {
        async fn lookup(&self, _: &IdentityRecord, _: Option<&str>) -> LookupResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().unwrap_or(LookupResult::NotFound)
        }
    }
}
