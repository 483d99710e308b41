//! `dprscope-config`: DPR review service configuration management.
//!
//! Provides:
//! - Typed config schema (server, storage, predictor, extractors, logging)
//! - YAML read/write
//! - `${ENV_VAR}` substitution and fixed env overrides with hard-coded fallbacks
//! - Config redaction for safe logging/display
//! - Default value application
//! - Validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, apply_env_overrides_with, collect_referenced_vars, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use redact::{collect_redacted_paths, redact, redact_config};
pub use schema::{
    DprScopeConfig, ExtractorsConfig, LoggingConfig, PredictorConfig, ServerConfig, StorageConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Resolve which config file to read: explicit path > `DPR_CONFIG` > default location.
pub fn resolve_config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = std::env::var(env::ENV_CONFIG_PATH) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    config_file_path(&config_dir())
}

/// Load, substitute env vars, apply overrides and defaults, then validate.
///
/// This is the main entry point for loading a config at runtime.
pub async fn load_and_prepare(path: &Path) -> Result<DprScopeConfig> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let raw = io::load_raw(path).await?;
    prepare(raw, &env)
}

/// The pure half of [`load_and_prepare`], operating on an already-read tree.
pub fn prepare(raw: Option<serde_json::Value>, env: &HashMap<String, String>) -> Result<DprScopeConfig> {
    let config: DprScopeConfig = match raw {
        Some(value) => {
            let value =
                resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
            serde_json::from_value(value).context("Failed to deserialize config")?
        }
        None => DprScopeConfig::default(),
    };

    let config = apply_env_overrides_with(config, env);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        bail!("Config has {} error(s); first: {}", report.errors.len(), report.errors[0]);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prepare_without_file_uses_fallbacks() {
        let cfg = prepare(None, &HashMap::new()).unwrap();
        assert_eq!(cfg.server.port, defaults::DEFAULT_PORT);
        assert_eq!(cfg.predictor.base_url, defaults::DEFAULT_PREDICTOR_URL);
        assert_eq!(cfg.storage.database_url, defaults::DEFAULT_DATABASE_URL);
        assert_eq!(cfg.server.cors_origin.as_deref(), Some(defaults::DEFAULT_CORS_ORIGIN));
    }

    #[test]
    fn prepare_layers_file_env_and_overrides() {
        let raw = json!({
            "server": { "port": 6000 },
            "predictor": { "baseUrl": "http://${ML_HOST}:8000/" }
        });
        let env: HashMap<String, String> = [
            ("ML_HOST".to_string(), "ml".to_string()),
            ("PORT".to_string(), "6500".to_string()),
        ]
        .into_iter()
        .collect();
        let cfg = prepare(Some(raw), &env).unwrap();
        assert_eq!(cfg.server.port, 6500);
        assert_eq!(cfg.predictor.base_url, "http://ml:8000");
    }

    #[test]
    fn prepare_rejects_invalid_config() {
        let raw = json!({ "predictor": { "timeoutSecs": 0 } });
        assert!(prepare(Some(raw), &HashMap::new()).is_err());
    }
}
