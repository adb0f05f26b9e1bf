use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::MedLensError;
use crate::types::{GuidanceRecord, IdentityRecord, ImagePayload, LookupResult};

/// Where a capture step gets its raw still image from.
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// An image file on disk (camera roll, scanner output).
    File(PathBuf),
    /// Raw encoded bytes already in memory (uploaded blob, camera frame).
    Bytes(Vec<u8>),
}

/// Turns a raw still image into a normalized payload.
#[async_trait]
pub trait ImageAcquirer: Send + Sync {
    /// Fails with [`MedLensError::Acquisition`] when the image cannot be read or re-encoded.
    async fn acquire(&self, source: &CaptureSource) -> Result<ImagePayload, MedLensError>;
}

/// Reads drug identity fields off a set of package photos.
#[async_trait]
pub trait IdentityExtractor: Send + Sync {
    /// Provider name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// One remote call, no retry. Fails with [`MedLensError::Extraction`].
    async fn extract(&self, images: &[ImagePayload], instruction: &str) -> Result<IdentityRecord, MedLensError>;

    /// Ask the model for dosage/usage guidance instead of identity fields.
    async fn guidance(&self, images: &[ImagePayload], instruction: &str) -> Result<GuidanceRecord, MedLensError>;
}

/// Resolves identity fields against a drug label database.
///
/// Never fails: transport and protocol problems are reported as [`LookupResult::NotFound`].
#[async_trait]
pub trait DrugLookup: Send + Sync {
    async fn lookup(&self, identity: &IdentityRecord, barcode: Option<&str>) -> LookupResult;
}
