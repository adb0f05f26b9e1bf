//! Scan Event Logger
//!
//! One structured event per wizard transition, emitted under the `scan_events` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    SessionStarted { total_steps: usize },
    SessionResumed { step_index: usize },
    Captured { step_index: usize, bytes: usize },
    CaptureFailed { step_index: usize, error_msg: String },
    Retaken { step_index: usize },
    Confirmed { step_index: usize },
    Finalized { variant: String, found: bool, low_confidence: bool },
    FinalizeFailed { error_msg: String },
    SessionReset,
}

#[derive(Debug, Serialize)]
pub struct ScanLogEntry {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: ScanEvent,
}

pub struct ScanEventLogger;

impl ScanEventLogger {
    /// Log a wizard event. Error messages are redacted first since they may echo provider responses.
    pub fn log_event(session_id: Uuid, mut event: ScanEvent) {
        match &mut event {
            ScanEvent::CaptureFailed { error_msg, .. } | ScanEvent::FinalizeFailed { error_msg } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            _ => {}
        }

        let entry = ScanLogEntry { session_id, timestamp: Utc::now(), event };
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "scan_events", session_id = %entry.session_id, event = %json, "Scan event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(ScanEvent::Confirmed { step_index: 1 }).unwrap();
        assert_eq!(value["type"], "confirmed");
        assert_eq!(value["step_index"], 1);
    }
}
