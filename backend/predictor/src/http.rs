use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use dprscope_core::{DprError, DprResult, FeatureSet, RiskPredictor};

/// Client for the risk-prediction microservice (`POST {base_url}/predict`).
pub struct HttpRiskPredictor {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRiskPredictor {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> DprResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DprError::Internal(format!("failed to build predictor client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/predict", self.base_url)
    }
}

#[async_trait]
impl RiskPredictor for HttpRiskPredictor {
    fn name(&self) -> &str {
        "http"
    }

    async fn predict_raw(&self, features: &FeatureSet) -> DprResult<Value> {
        let start = Instant::now();
        let mut request = self.client.post(self.endpoint()).json(features);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() { "timed out" } else { "unreachable" };
            warn!(endpoint = %self.endpoint(), error = %e, "Risk predictor {kind}");
            DprError::PredictionFailed(format!("predictor {kind}: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Risk predictor returned an error status");
            return Err(DprError::PredictionFailed(format!(
                "predictor returned HTTP {status}: {body}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| DprError::PredictionFailed(format!("predictor sent invalid JSON: {e}")))?;

        debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            features = features.len(),
            "Risk prediction received"
        );
        Ok(body)
    }
}
