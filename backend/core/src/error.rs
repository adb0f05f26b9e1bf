use thiserror::Error;

/// Top-level error type for MedLens.
///
/// Each variant maps to a distinct recovery path: acquisition errors re-prompt
/// the same capture step, extraction errors end the finalization attempt,
/// configuration errors block finalization until a credential is supplied.
#[derive(Debug, Error)]
pub enum MedLensError {
    /// Image decode/encode or read failure.
    #[error("could not read image: {0}")]
    Acquisition(String),

    /// Remote inference failure or unparsable model output.
    #[error("identification failed: {0}")]
    Extraction(String),

    /// Lookup transport failure. Downgraded to `NotFound` at the lookup boundary.
    #[error("lookup transport error: {0}")]
    LookupTransport(String),

    /// Missing or unusable configuration (typically the API credential).
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The requested wizard operation is not valid in the current phase.
    #[error("cannot {operation} while {phase}")]
    InvalidTransition { operation: &'static str, phase: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MedLensError {
    /// Whether the wizard can stay on the current step after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Acquisition(_) | Self::Configuration(_) | Self::Storage(_) | Self::InvalidTransition { .. }
        )
    }
}
