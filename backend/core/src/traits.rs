use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::DprResult;
use crate::features::FeatureSet;
use crate::types::{
    Completion, DprRecord, ExtractionResult, Failure, RecordQuery, RiskPrediction, TextAnalysis,
};

/// Derives a feature set and quality score from an uploaded document.
#[async_trait]
pub trait FeatureExtractor: Send + Sync {
    /// Extractor name used in logs and error reports (e.g., "text", "image").
    fn name(&self) -> &str;

    async fn extract(&self, path: &Path) -> DprResult<ExtractionResult>;
}

/// Client for the remote risk model.
#[async_trait]
pub trait RiskPredictor: Send + Sync {
    fn name(&self) -> &str;

    /// Send features and return the predictor's response body untouched.
    async fn predict_raw(&self, features: &FeatureSet) -> DprResult<Value>;

    /// Send features and parse the response into a structured prediction.
    async fn predict(&self, features: &FeatureSet) -> DprResult<RiskPrediction> {
        let body = self.predict_raw(features).await?;
        RiskPrediction::from_response(&body)
    }
}

/// Persistence for DPR records.
///
/// `complete` and `fail` only succeed on records still in `processing`;
/// `set_feedback` never creates a record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a placeholder record in the `processing` state.
    async fn create(&self, filename: &str) -> DprResult<DprRecord>;

    async fn get(&self, id: Uuid) -> DprResult<Option<DprRecord>>;

    /// Move a record to `done`, writing every result field in one update.
    async fn complete(&self, id: Uuid, completion: &Completion) -> DprResult<DprRecord>;

    /// Move a record to `failed` with the captured reason.
    async fn fail(&self, id: Uuid, failure: &Failure) -> DprResult<DprRecord>;

    /// Replace the feedback text of an existing record.
    async fn set_feedback(&self, id: Uuid, feedback: &str) -> DprResult<DprRecord>;

    /// Most recent records first.
    async fn list(&self, query: &RecordQuery) -> DprResult<Vec<DprRecord>>;
}

/// Free-text review of DPR content without a file upload.
#[async_trait]
pub trait TextAnalyzer: Send + Sync {
    async fn analyze(&self, text: &str, structured_fields: Option<&Value>) -> DprResult<TextAnalysis>;
}
