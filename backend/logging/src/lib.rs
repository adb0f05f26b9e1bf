//! Structured logging components for MedLens.
//!
//! Handles log redaction, console and rolling JSON output, and wizard event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ScanEvent, ScanEventLogger, ScanLogEntry};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
