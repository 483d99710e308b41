//! Config validation: schema checks with user-friendly error messages.

use crate::schema::DprScopeConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &DprScopeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_storage(config, &mut report);
    validate_predictor(config, &mut report);
    validate_extractors(config, &mut report);
    report
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn validate_server(config: &DprScopeConfig, report: &mut ValidationReport) {
    let server = &config.server;
    if server.port == 0 {
        report.error("server.port", "Port must be between 1 and 65535");
    }
    if server.bind_address.trim().is_empty() {
        report.error("server.bindAddress", "Bind address cannot be empty");
    }
    if server.upload_dir.trim().is_empty() {
        report.error("server.uploadDir", "Upload directory cannot be empty");
    }
    if server.max_upload_bytes == 0 {
        report.error("server.maxUploadBytes", "Upload limit must be greater than zero");
    }
    if matches!(&server.cors_origin, Some(o) if o.trim().is_empty()) {
        report.warn("server.corsOrigin", "Empty CORS origin; browsers will reject API calls");
    }
}

fn validate_storage(config: &DprScopeConfig, report: &mut ValidationReport) {
    if config.storage.database_url.trim().is_empty() {
        report.error("storage.databaseUrl", "Database location cannot be empty");
    } else if config.storage.is_in_memory() {
        report.warn("storage.databaseUrl", "In-memory store; records are lost on restart");
    }
}

fn validate_predictor(config: &DprScopeConfig, report: &mut ValidationReport) {
    let predictor = &config.predictor;
    if !is_http_url(&predictor.base_url) {
        report.error(
            "predictor.baseUrl",
            format!("Expected an http(s) URL, got '{}'", predictor.base_url),
        );
    }
    if predictor.timeout_secs == 0 {
        report.error("predictor.timeoutSecs", "Timeout must be at least one second");
    }
    if let Some(cmd) = &predictor.train_command {
        if cmd.first().map_or(true, |program| program.trim().is_empty()) {
            report.error("predictor.trainCommand", "Training command needs a program name");
        }
    }
}

fn validate_extractors(config: &DprScopeConfig, report: &mut ValidationReport) {
    let extractors = &config.extractors;
    for (path, url) in [
        ("extractors.textUrl", &extractors.text_url),
        ("extractors.imageUrl", &extractors.image_url),
    ] {
        if let Some(url) = url {
            if !is_http_url(url) {
                report.error(path, format!("Expected an http(s) URL, got '{url}'"));
            }
        }
    }
    if extractors.timeout_secs == 0 {
        report.error("extractors.timeoutSecs", "Timeout must be at least one second");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let report = validate(&DprScopeConfig::default());
        assert!(report.is_valid(), "{:?}", report.errors);
    }

    #[test]
    fn rejects_zero_port_and_timeout() {
        let mut cfg = DprScopeConfig::default();
        cfg.server.port = 0;
        cfg.predictor.timeout_secs = 0;
        let report = validate(&cfg);
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"server.port"));
        assert!(paths.contains(&"predictor.timeoutSecs"));
    }

    #[test]
    fn rejects_non_http_predictor() {
        let mut cfg = DprScopeConfig::default();
        cfg.predictor.base_url = "127.0.0.1:8000".into();
        assert!(!validate(&cfg).is_valid());
    }

    #[test]
    fn warns_on_empty_cors_origin() {
        let mut cfg = DprScopeConfig::default();
        cfg.server.cors_origin = Some(" ".into());
        let report = validate(&cfg);
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "server.corsOrigin");
    }

    #[test]
    fn rejects_empty_train_command_program() {
        let mut cfg = DprScopeConfig::default();
        cfg.predictor.train_command = Some(vec!["".into(), "train.py".into()]);
        assert!(!validate(&cfg).is_valid());
    }
}
