//! DPR review service configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. Every section has defaults,
//! so an empty file (or no file at all) yields a runnable config.

use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DprScopeConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Record persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Remote risk predictor
    #[serde(default)]
    pub predictor: PredictorConfig,

    /// Text/image feature extractors
    #[serde(default)]
    pub extractors: ExtractorsConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "defaults::bind_address")]
    pub bind_address: String,

    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Origin allowed by CORS; `None` until defaults are applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors_origin: Option<String>,

    /// Directory uploaded files are staged in before extraction.
    #[serde(default = "defaults::upload_dir")]
    pub upload_dir: String,

    #[serde(default = "defaults::max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: defaults::bind_address(),
            port: defaults::port(),
            cors_origin: None,
            upload_dir: defaults::upload_dir(),
            max_upload_bytes: defaults::max_upload_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// SQLite database path, or `:memory:` for a throwaway store.
    #[serde(default = "defaults::database_url")]
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::database_url(),
        }
    }
}

impl StorageConfig {
    pub fn is_in_memory(&self) -> bool {
        self.database_url == ":memory:"
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictorConfig {
    /// Base URL of the risk model service; `/predict` is appended.
    #[serde(default = "defaults::predictor_url")]
    pub base_url: String,

    #[serde(default = "defaults::predictor_timeout_secs")]
    pub timeout_secs: u64,

    /// Bearer token sent to the predictor, if it requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Training command; the dataset path is appended as the last argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub train_command: Option<Vec<String>>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::predictor_url(),
            timeout_secs: defaults::predictor_timeout_secs(),
            api_key: None,
            train_command: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// Remote extractor endpoints. An unset URL selects the local PDF extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractorsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default = "defaults::extractor_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ExtractorsConfig {
    fn default() -> Self {
        Self {
            text_url: None,
            image_url: None,
            timeout_secs: defaults::extractor_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "dprscope_pipeline=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Directory for rolling NDJSON log files; console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Emit JSON on the console instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}
