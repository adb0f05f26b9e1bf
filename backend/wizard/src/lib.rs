//! Multi-step capture/review/confirm wizard with persisted progress.

pub mod pipeline;
pub mod session;
pub mod state;

pub use pipeline::{ExtractorFactory, Finalizer, GuidancePipeline, LabelLookupPipeline, VisionExtractorFactory};
pub use session::{ResumePolicy, ScanWizard};
pub use state::{WizardPhase, WizardState, WizardView};
