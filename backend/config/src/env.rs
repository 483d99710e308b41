//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside YAML string values, resolved at load time.
//!   Only uppercase `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes to a literal `${VAR}`.
//! - Fixed override variables (`PORT`, `DPR_PREDICTOR_URL`, ...) applied on top of the file.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use crate::schema::DprScopeConfig;

pub const ENV_CONFIG_PATH: &str = "DPR_CONFIG";
pub const ENV_PORT: &str = "PORT";
pub const ENV_BIND: &str = "DPR_BIND";
pub const ENV_PREDICTOR_URL: &str = "DPR_PREDICTOR_URL";
pub const ENV_PREDICTOR_API_KEY: &str = "DPR_PREDICTOR_API_KEY";
pub const ENV_DATABASE_URL: &str = "DPR_DATABASE_URL";
pub const ENV_UPLOAD_DIR: &str = "DPR_UPLOAD_DIR";
pub const ENV_CORS_ORIGIN: &str = "DPR_CORS_ORIGIN";
pub const ENV_LOG_LEVEL: &str = "RUST_LOG";
pub const ENV_LOG_DIR: &str = "DPR_LOG_DIR";

/// `$${NAME}` or `${NAME}`; group 1 is the optional escape `$`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut error: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                if error.is_none() {
                    error = Some(MissingEnvVarError {
                        var_name: var_name.to_string(),
                        config_path: path.to_string(),
                    });
                }
                String::new()
            }
        }
    });

    if let Some(err) = error {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Collect all env var names referenced in a config value tree (for diagnostics).
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_VAR_PATTERN.captures_iter(s) {
                if caps[1].is_empty() {
                    out.push(caps[2].to_string());
                }
            }
        }
        Value::Array(arr) => arr.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}

/// Apply fixed override variables from the process environment.
pub fn apply_env_overrides(config: DprScopeConfig) -> DprScopeConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply fixed override variables from a provided map.
///
/// Empty values are ignored; an unparseable `PORT` keeps the configured port.
pub fn apply_env_overrides_with(
    mut config: DprScopeConfig,
    env: &HashMap<String, String>,
) -> DprScopeConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(port) = get(ENV_PORT) {
        match port.trim().parse() {
            Ok(p) => config.server.port = p,
            Err(_) => debug!(value = %port, "Ignoring unparseable PORT override"),
        }
    }
    if let Some(bind) = get(ENV_BIND) {
        config.server.bind_address = bind;
    }
    if let Some(url) = get(ENV_PREDICTOR_URL) {
        config.predictor.base_url = url;
    }
    if let Some(key) = get(ENV_PREDICTOR_API_KEY) {
        config.predictor.api_key = Some(key);
    }
    if let Some(db) = get(ENV_DATABASE_URL) {
        config.storage.database_url = db;
    }
    if let Some(dir) = get(ENV_UPLOAD_DIR) {
        config.server.upload_dir = dir;
    }
    if let Some(origin) = get(ENV_CORS_ORIGIN) {
        config.server.cors_origin = Some(origin);
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = Some(level);
    }
    if let Some(dir) = get(ENV_LOG_DIR) {
        config.logging.dir = Some(dir);
    }
    config
}
