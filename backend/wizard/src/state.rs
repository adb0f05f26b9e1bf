//! Wizard phases and the in-memory state they guard.

use std::fmt;

use medlens_core::{ImagePayload, PersistedSession, ScanOutcome};
use serde::Serialize;
use uuid::Uuid;

/// Where the wizard is. `step` is zero-based.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum WizardPhase {
    /// Waiting for a capture for `step`.
    Idle { step: usize },
    /// A draft for `step` is held for review.
    Reviewing { step: usize },
    /// Every step is confirmed; waiting on `finalize`.
    Finalizing,
    Done { outcome: ScanOutcome },
    Error { message: String },
}

impl WizardPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

impl fmt::Display for WizardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle { step } => write!(f, "idle at step {}", step + 1),
            Self::Reviewing { step } => write!(f, "reviewing step {}", step + 1),
            Self::Finalizing => f.write_str("finalizing"),
            Self::Done { .. } => f.write_str("done"),
            Self::Error { .. } => f.write_str("in error"),
        }
    }
}

/// The single source of truth for one scan session.
///
/// `confirmed.len()` is the step index; `draft` is only set while `Reviewing`.
#[derive(Debug, Clone)]
pub struct WizardState {
    pub session_id: Uuid,
    pub confirmed: Vec<ImagePayload>,
    pub draft: Option<ImagePayload>,
    pub phase: WizardPhase,
}

impl WizardState {
    pub fn fresh() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            confirmed: Vec::new(),
            draft: None,
            phase: WizardPhase::Idle { step: 0 },
        }
    }

    /// Restore from storage; the index is re-derived from the image count.
    /// A session with all `total_steps` confirmed goes straight to `Finalizing`.
    pub fn resumed(session: PersistedSession, total_steps: usize) -> Self {
        let step = session.confirmed_images.len();
        let phase = if step >= total_steps { WizardPhase::Finalizing } else { WizardPhase::Idle { step } };
        Self {
            session_id: session.session_id,
            confirmed: session.confirmed_images,
            draft: None,
            phase,
        }
    }

    pub fn step_index(&self) -> usize {
        self.confirmed.len()
    }

    /// Snapshot for the store, as it will look once `extra` is appended.
    pub fn persisted_with(&self, extra: &ImagePayload) -> PersistedSession {
        let mut confirmed_images = self.confirmed.clone();
        confirmed_images.push(extra.clone());
        PersistedSession {
            session_id: self.session_id,
            step_index: confirmed_images.len(),
            confirmed_images,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Read-only view handed to presentation.
#[derive(Debug, Clone, Serialize)]
pub struct WizardView {
    pub session_id: Uuid,
    pub phase: WizardPhase,
    pub step_index: usize,
    pub total_steps: usize,
    /// Label of the step being captured or reviewed.
    pub step_label: Option<String>,
    #[serde(skip)]
    pub draft: Option<ImagePayload>,
}
