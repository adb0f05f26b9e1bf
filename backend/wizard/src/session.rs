//! The wizard controller.
//!
//! One [`ScanWizard`] owns the [`WizardState`] for a device. Every public
//! operation takes the state lock for its whole duration, including the
//! awaits on acquisition, storage and finalization, so operations never
//! interleave.

use std::str::FromStr;
use std::sync::Arc;

use medlens_core::{CaptureSource, ImageAcquirer, MedLensError, ScanOutcome};
use medlens_logging::{ScanEvent, ScanEventLogger};
use medlens_store::SessionStore;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::pipeline::Finalizer;
use crate::state::{WizardPhase, WizardState, WizardView};

/// What to do with a persisted session found at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    /// Continue an unfinished session where it stopped.
    #[default]
    Resume,
    /// Always start over.
    Discard,
}

impl FromStr for ResumePolicy {
    type Err = MedLensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "resume" => Ok(Self::Resume),
            "discard" => Ok(Self::Discard),
            other => Err(MedLensError::Configuration(format!("unknown resume policy '{other}'"))),
        }
    }
}

fn storage(e: anyhow::Error) -> MedLensError {
    MedLensError::Storage(format!("{e:#}"))
}

pub struct ScanWizard {
    state: Mutex<WizardState>,
    steps: Vec<String>,
    sessions: SessionStore,
    acquirer: Arc<dyn ImageAcquirer>,
    finalizer: Arc<dyn Finalizer>,
    /// Used when no credential is saved in the store.
    credential_fallback: Option<String>,
}

impl ScanWizard {
    /// Cold start: restore or discard whatever the store holds.
    ///
    /// Under [`ResumePolicy::Resume`] a session with every step confirmed
    /// reopens in `Finalizing`; one holding more images than there are
    /// steps is stale and cleared.
    pub async fn open(
        steps: Vec<String>,
        policy: ResumePolicy,
        sessions: SessionStore,
        acquirer: Arc<dyn ImageAcquirer>,
        finalizer: Arc<dyn Finalizer>,
    ) -> Result<Self, MedLensError> {
        if steps.is_empty() {
            return Err(MedLensError::Configuration("at least one capture step is required".into()));
        }
        let total = steps.len();
        let persisted = sessions.load_session().await.map_err(storage)?;

        let state = match (policy, persisted) {
            (ResumePolicy::Resume, Some(session)) if session.confirmed_images.len() <= total => {
                let state = WizardState::resumed(session, total);
                ScanEventLogger::log_event(state.session_id, ScanEvent::SessionResumed { step_index: state.step_index() });
                state
            }
            (_, stale) => {
                if stale.is_some() {
                    info!(?policy, "Discarding persisted session");
                    sessions.clear_session().await.map_err(storage)?;
                }
                let state = WizardState::fresh();
                ScanEventLogger::log_event(state.session_id, ScanEvent::SessionStarted { total_steps: total });
                state
            }
        };

        Ok(Self {
            state: Mutex::new(state),
            steps,
            sessions,
            acquirer,
            finalizer,
            credential_fallback: None,
        })
    }

    pub fn with_credential_fallback(mut self, credential: Option<String>) -> Self {
        self.credential_fallback = credential.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn variant(&self) -> &'static str {
        self.finalizer.variant()
    }

    pub async fn view(&self) -> WizardView {
        let state = self.state.lock().await;
        let label_step = match state.phase {
            WizardPhase::Idle { step } | WizardPhase::Reviewing { step } => Some(step),
            _ => None,
        };
        WizardView {
            session_id: state.session_id,
            phase: state.phase.clone(),
            step_index: state.step_index(),
            total_steps: self.steps.len(),
            step_label: label_step.and_then(|s| self.steps.get(s).cloned()),
            draft: state.draft.clone(),
        }
    }

    /// Abandon anything in progress and begin at the first step.
    pub async fn start_scan(&self) -> Result<WizardView, MedLensError> {
        {
            let mut state = self.state.lock().await;
            self.sessions.clear_session().await.map_err(storage)?;
            *state = WizardState::fresh();
            ScanEventLogger::log_event(state.session_id, ScanEvent::SessionStarted { total_steps: self.steps.len() });
        }
        Ok(self.view().await)
    }

    /// Acquire a draft for the current step. Failure leaves the step waiting.
    pub async fn capture(&self, source: &CaptureSource) -> Result<WizardView, MedLensError> {
        {
            let mut state = self.state.lock().await;
            let WizardPhase::Idle { step } = state.phase else {
                return Err(invalid("capture", &state.phase));
            };
            match self.acquirer.acquire(source).await {
                Ok(payload) => {
                    ScanEventLogger::log_event(state.session_id, ScanEvent::Captured { step_index: step, bytes: payload.len() });
                    state.draft = Some(payload);
                    state.phase = WizardPhase::Reviewing { step };
                }
                Err(e) => {
                    ScanEventLogger::log_event(
                        state.session_id,
                        ScanEvent::CaptureFailed { step_index: step, error_msg: e.to_string() },
                    );
                    return Err(e);
                }
            }
        }
        Ok(self.view().await)
    }

    /// Drop the draft and wait for a new capture of the same step.
    pub async fn retake_current(&self) -> Result<WizardView, MedLensError> {
        {
            let mut state = self.state.lock().await;
            let WizardPhase::Reviewing { step } = state.phase else {
                return Err(invalid("retake", &state.phase));
            };
            state.draft = None;
            state.phase = WizardPhase::Idle { step };
            ScanEventLogger::log_event(state.session_id, ScanEvent::Retaken { step_index: step });
        }
        Ok(self.view().await)
    }

    /// Accept the draft. The extended sequence is persisted before the step advances.
    pub async fn confirm_current(&self) -> Result<WizardView, MedLensError> {
        {
            let mut state = self.state.lock().await;
            let WizardPhase::Reviewing { step } = state.phase else {
                return Err(invalid("confirm", &state.phase));
            };
            let Some(draft) = state.draft.take() else {
                state.phase = WizardPhase::Idle { step };
                return Err(invalid("confirm", &state.phase));
            };

            if let Err(e) = self.sessions.save_session(&state.persisted_with(&draft)).await {
                warn!(step_index = step, error = %e, "Could not persist confirmed capture");
                state.draft = Some(draft);
                return Err(storage(e));
            }

            state.confirmed.push(draft);
            let next = state.step_index();
            state.phase = if next < self.steps.len() {
                WizardPhase::Idle { step: next }
            } else {
                WizardPhase::Finalizing
            };
            ScanEventLogger::log_event(state.session_id, ScanEvent::Confirmed { step_index: step });
        }
        Ok(self.view().await)
    }

    /// Run the finalization pipeline over the confirmed captures.
    ///
    /// Without a credential this fails with a configuration error and the
    /// wizard stays `Finalizing`, so the user can save a key and retry.
    pub async fn finalize(&self) -> Result<ScanOutcome, MedLensError> {
        let mut state = self.state.lock().await;
        if state.phase != WizardPhase::Finalizing {
            return Err(invalid("finalize", &state.phase));
        }

        let saved = self.sessions.credential().await.map_err(storage)?;
        let Some(credential) = saved.or_else(|| self.credential_fallback.clone()) else {
            return Err(MedLensError::Configuration(
                "no API key saved; run `medlens key set` and try again".into(),
            ));
        };

        match self.finalizer.finalize(&state.confirmed, &credential).await {
            Ok(outcome) => {
                if let Err(e) = self.sessions.clear_session().await {
                    warn!(error = %e, "Could not clear finished session");
                }
                let (found, low_confidence) = match &outcome {
                    ScanOutcome::Label { lookup, low_confidence, .. } => (lookup.is_found(), *low_confidence),
                    ScanOutcome::Guidance { low_confidence, .. } => (false, *low_confidence),
                };
                ScanEventLogger::log_event(
                    state.session_id,
                    ScanEvent::Finalized { variant: self.finalizer.variant().to_string(), found, low_confidence },
                );
                state.phase = WizardPhase::Done { outcome: outcome.clone() };
                Ok(outcome)
            }
            Err(e) => {
                ScanEventLogger::log_event(state.session_id, ScanEvent::FinalizeFailed { error_msg: e.to_string() });
                state.phase = WizardPhase::Error { message: e.to_string() };
                Err(e)
            }
        }
    }

    /// Leave a finished or failed scan. The credential is kept.
    pub async fn reset_session(&self) -> Result<WizardView, MedLensError> {
        {
            let mut state = self.state.lock().await;
            if !state.phase.is_terminal() {
                return Err(invalid("reset", &state.phase));
            }
            self.sessions.clear_session().await.map_err(storage)?;
            ScanEventLogger::log_event(state.session_id, ScanEvent::SessionReset);
            *state = WizardState::fresh();
        }
        Ok(self.view().await)
    }
}

fn invalid(operation: &'static str, phase: &WizardPhase) -> MedLensError {
    MedLensError::InvalidTransition { operation, phase: phase.to_string() }
}
