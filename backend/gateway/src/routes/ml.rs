//! Direct access to the risk predictor and the training trigger.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use dprscope_core::FeatureSet;
use dprscope_predictor::TrainOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/ml/predict`: forward a feature object, return the raw prediction.
pub async fn predict(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;
    let features = FeatureSet::try_from(value)
        .map_err(|_| ApiError::BadRequest("Features must be a JSON object".into()))?;

    state
        .predictor()
        .predict_raw(&features)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("ML prediction failed", e))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrainRequest {
    dataset_path: Option<PathBuf>,
}

/// `POST /api/ml/train`: body `{datasetPath?}`; an empty body runs in demo mode.
pub async fn train(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<TrainOutcome>, ApiError> {
    let request: TrainRequest = if body.is_empty() {
        TrainRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?
    };

    state
        .trainer
        .train(request.dataset_path)
        .await
        .map(Json)
        .map_err(|e| ApiError::failed("Training failed", e))
}
