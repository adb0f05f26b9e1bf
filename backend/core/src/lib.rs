//! Shared data model, error taxonomy, and seam traits for MedLens.

mod coerce;
pub mod error;
pub mod traits;
pub mod types;

pub use error::MedLensError;
pub use traits::{CaptureSource, DrugLookup, IdentityExtractor, ImageAcquirer};
pub use types::{
    DrugRecord, GuidanceRecord, IdentityRecord, ImagePayload, LookupResult, PersistedSession, ScanOutcome,
    Source,
};
