//! Wiring of configured collaborators into the pipeline and API state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use dprscope_config::{DprScopeConfig, LoggingConfig, StorageConfig};
use dprscope_core::{RecordStore, RiskPredictor};
use dprscope_gateway::{AppState, RouterOptions};
use dprscope_logging::LogOptions;
use dprscope_pipeline::{KeywordAnalyzer, ReviewPipeline};
use dprscope_predictor::{HttpRiskPredictor, Trainer};
use dprscope_store::{InMemoryStore, SqliteStore};

pub fn log_options(config: &LoggingConfig) -> LogOptions {
    LogOptions {
        level: config.level.clone().unwrap_or_else(|| "info".to_string()),
        dir: config.dir.as_ref().map(PathBuf::from),
        json: config.json,
    }
}

pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    if config.is_in_memory() {
        warn!("Using in-memory record store; reviews will not survive a restart");
        return Ok(Arc::new(InMemoryStore::new()));
    }
    let store = SqliteStore::open(&config.database_url)
        .with_context(|| format!("failed to open database {}", config.database_url))?;
    info!(db = %config.database_url, "Opened SQLite record store");
    Ok(Arc::new(store))
}

pub fn build_predictor(config: &DprScopeConfig) -> Result<Arc<dyn RiskPredictor>> {
    let predictor = &config.predictor;
    let mut client = HttpRiskPredictor::new(
        &predictor.base_url,
        Duration::from_secs(predictor.timeout_secs),
    )
    .context("failed to create risk predictor client")?;
    if let Some(key) = &predictor.api_key {
        client = client.with_api_key(key);
    }
    info!(endpoint = %client.endpoint(), "Risk predictor configured");
    Ok(Arc::new(client))
}

pub fn build_pipeline(config: &DprScopeConfig) -> Result<ReviewPipeline> {
    let timeout = Duration::from_secs(config.extractors.timeout_secs);
    let text = dprscope_extract::text_extractor(config.extractors.text_url.as_deref(), timeout)
        .context("failed to create text extractor")?;
    let image = dprscope_extract::image_extractor(config.extractors.image_url.as_deref(), timeout)
        .context("failed to create image extractor")?;
    info!(text = text.name(), image = image.name(), "Feature extractors configured");

    Ok(ReviewPipeline::new(
        open_store(&config.storage)?,
        text,
        image,
        build_predictor(config)?,
    ))
}

pub fn build_state(config: &DprScopeConfig) -> Result<AppState> {
    Ok(AppState {
        pipeline: Arc::new(build_pipeline(config)?),
        analyzer: Arc::new(KeywordAnalyzer::new()),
        trainer: Trainer::new(config.predictor.train_command.clone()),
        upload_dir: PathBuf::from(&config.server.upload_dir),
    })
}

pub fn router_options(config: &DprScopeConfig) -> RouterOptions {
    RouterOptions {
        cors_origin: config
            .server
            .cors_origin
            .clone()
            .unwrap_or_else(|| "*".to_string()),
        max_upload_bytes: config.server.max_upload_bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory_config() -> DprScopeConfig {
        let mut config = DprScopeConfig::default();
        config.storage.database_url = ":memory:".into();
        config
    }

    #[tokio::test]
    async fn builds_state_with_in_memory_store() {
        let state = build_state(&in_memory_config()).unwrap();
        let record = state.store().create("check.pdf").await.unwrap();
        assert!(state.store().get(record.id).await.unwrap().is_some());
        assert_eq!(state.predictor().name(), "http");
    }

    #[tokio::test]
    async fn sqlite_store_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DprScopeConfig::default();
        config.storage.database_url = dir.path().join("reviews.db").to_string_lossy().into_owned();

        let store = open_store(&config.storage).unwrap();
        store.create("site.pdf").await.unwrap();
        assert!(dir.path().join("reviews.db").exists());
    }

    #[test]
    fn log_options_follow_config() {
        let logging = LoggingConfig {
            level: Some("debug".into()),
            dir: Some("/var/log/dprscope".into()),
            json: true,
        };
        let options = log_options(&logging);
        assert_eq!(options.level, "debug");
        assert_eq!(options.dir, Some(PathBuf::from("/var/log/dprscope")));
        assert!(options.json);
    }
}
