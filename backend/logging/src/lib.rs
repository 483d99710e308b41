//! Telemetry and structured logging for the DPR review service.
//!
//! Handles log redaction, JSON output, daily file rotation, and pipeline event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PipelineEvent, PipelineStage};
pub use logger::{init_logger, LogOptions};
pub use redact::redact_sensitive_data;
