//! Image acquisition and normalization for capture steps.

use async_trait::async_trait;
use medlens_core::{CaptureSource, ImageAcquirer, ImagePayload, MedLensError};
use tracing::{info, warn};

pub mod normalize;
pub mod mime_detect;

pub use normalize::{normalize_image, scaled_dimensions, NormalizeOptions, JPEG_QUALITY, MAX_LONG_EDGE};
pub use mime_detect::{detect_mime_type, is_decodable, sniff_image_mime};

/// Reads a capture source and normalizes it on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct ImageNormalizer {
    options: NormalizeOptions,
}

impl ImageNormalizer {
    pub fn new(options: NormalizeOptions) -> Self {
        Self { options }
    }

    async fn read_source(source: &CaptureSource) -> Result<Vec<u8>, MedLensError> {
        match source {
            CaptureSource::Bytes(bytes) => Ok(bytes.clone()),
            CaptureSource::File(path) => tokio::fs::read(path)
                .await
                .map_err(|e| MedLensError::Acquisition(format!("{}: {e}", path.display()))),
        }
    }
}

#[async_trait]
impl ImageAcquirer for ImageNormalizer {
    async fn acquire(&self, source: &CaptureSource) -> Result<ImagePayload, MedLensError> {
        let bytes = Self::read_source(source).await?;

        match sniff_image_mime(&bytes) {
            Some(mime) if is_decodable(mime) => {}
            Some(mime) => {
                warn!(mime, "Unsupported capture format");
                return Err(MedLensError::Acquisition(format!(
                    "{mime} photos are not supported; export as JPEG or PNG"
                )));
            }
            None => {
                let claimed = match source {
                    CaptureSource::File(path) => detect_mime_type(path),
                    CaptureSource::Bytes(_) => "unknown",
                };
                warn!(claimed, "Capture is not an image");
                return Err(MedLensError::Acquisition(format!("not a recognized image (looks like {claimed})")));
            }
        }

        let options = self.options;
        let payload = tokio::task::spawn_blocking(move || normalize_image(&bytes, options))
            .await
            .map_err(|e| MedLensError::Acquisition(format!("normalization task failed: {e}")))?
            .map_err(|e| MedLensError::Acquisition(format!("{e:#}")))?;

        info!(bytes = payload.len(), "Captured image normalized");
        Ok(payload)
    }
}
