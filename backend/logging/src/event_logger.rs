//! Pipeline Event Logger
//!
//! Structured review-pipeline events written through `tracing` under the
//! `pipeline_events` target, so the NDJSON file layer captures them verbatim.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Ingest,
    TextExtraction,
    ImageExtraction,
    Prediction,
    Aggregation,
    Feedback,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    Received {
        filename: String,
    },
    StageCompleted {
        stage: PipelineStage,
        elapsed_ms: u64,
    },
    StageFailed {
        stage: PipelineStage,
        error_msg: String,
    },
    Completed {
        decision: String,
        risk_level: String,
        overall_score: u8,
    },
    FeedbackUpdated {
        length: usize,
    },
}

impl PipelineEvent {
    fn is_failure(&self) -> bool {
        matches!(self, PipelineEvent::StageFailed { .. })
    }
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub record_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Log a pipeline event for a record, redacting free-form messages first.
    pub fn log_event(record_id: Uuid, event: PipelineEvent) {
        let entry = Self::entry(record_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_default();
        if entry.event.is_failure() {
            warn!(target: "pipeline_events", record_id = %record_id, event = %payload, "Pipeline event");
        } else {
            info!(target: "pipeline_events", record_id = %record_id, event = %payload, "Pipeline event");
        }
    }

    fn entry(record_id: Uuid, mut event: PipelineEvent) -> EventLogEntry {
        match &mut event {
            PipelineEvent::Received { filename } => {
                *filename = redact_sensitive_data(filename);
            }
            PipelineEvent::StageFailed { error_msg, .. } => {
                *error_msg = redact_sensitive_data(error_msg);
            }
            _ => {}
        }
        EventLogEntry {
            record_id,
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_messages_are_redacted() {
        let entry = EventLogger::entry(
            Uuid::new_v4(),
            PipelineEvent::StageFailed {
                stage: PipelineStage::Prediction,
                error_msg: "401 for Bearer abcdefghijklmnop".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "stage_failed");
        assert_eq!(json["event"]["stage"], "prediction");
        assert!(!json["event"]["error_msg"].as_str().unwrap().contains("abcdefghijklmnop"));
    }

    #[test]
    fn test_completed_serialization() {
        let entry = EventLogger::entry(
            Uuid::nil(),
            PipelineEvent::Completed {
                decision: "reject".into(),
                risk_level: "High".into(),
                overall_score: 70,
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["overall_score"], 70);
        assert_eq!(json["record_id"], Uuid::nil().to_string());
    }

    #[test]
    fn test_log_event_without_subscriber_does_not_panic() {
        EventLogger::log_event(Uuid::new_v4(), PipelineEvent::FeedbackUpdated { length: 12 });
    }
}
