//! Config defaults: hard-coded fallbacks and post-load default application.

use crate::schema::DprScopeConfig;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
/// 25 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_DATABASE_URL: &str = "dprscope.db";
pub const DEFAULT_PREDICTOR_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PREDICTOR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_EXTRACTOR_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LOG_LEVEL: &str = "info";

pub(crate) fn bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

pub(crate) fn port() -> u16 {
    DEFAULT_PORT
}

pub(crate) fn upload_dir() -> String {
    DEFAULT_UPLOAD_DIR.to_string()
}

pub(crate) fn max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

pub(crate) fn database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

pub(crate) fn predictor_url() -> String {
    DEFAULT_PREDICTOR_URL.to_string()
}

pub(crate) fn predictor_timeout_secs() -> u64 {
    DEFAULT_PREDICTOR_TIMEOUT_SECS
}

pub(crate) fn extractor_timeout_secs() -> u64 {
    DEFAULT_EXTRACTOR_TIMEOUT_SECS
}

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: DprScopeConfig) -> DprScopeConfig {
    let config = apply_server_defaults(config);
    let config = apply_predictor_defaults(config);
    apply_logging_defaults(config)
}

/// Ensure a CORS origin is set.
fn apply_server_defaults(mut config: DprScopeConfig) -> DprScopeConfig {
    if config.server.cors_origin.is_none() {
        config.server.cors_origin = Some(DEFAULT_CORS_ORIGIN.to_string());
    }
    config
}

/// Strip trailing slashes so `/predict` can be appended verbatim.
fn apply_predictor_defaults(mut config: DprScopeConfig) -> DprScopeConfig {
    let trimmed = config.predictor.base_url.trim_end_matches('/');
    if trimmed.len() != config.predictor.base_url.len() {
        config.predictor.base_url = trimmed.to_string();
    }
    if matches!(&config.predictor.train_command, Some(cmd) if cmd.is_empty()) {
        config.predictor.train_command = None;
    }
    config
}

fn apply_logging_defaults(mut config: DprScopeConfig) -> DprScopeConfig {
    if config.logging.level.is_none() {
        config.logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
