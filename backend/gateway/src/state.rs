use std::path::PathBuf;
use std::sync::Arc;

use dprscope_core::{RecordStore, RiskPredictor, TextAnalyzer};
use dprscope_pipeline::ReviewPipeline;
use dprscope_predictor::Trainer;

/// Shared application state for API handlers.
pub struct AppState {
    /// Shared with the detached review tasks spawned per upload.
    pub pipeline: Arc<ReviewPipeline>,
    pub analyzer: Arc<dyn TextAnalyzer>,
    pub trainer: Trainer,
    /// Where uploads are staged before extraction.
    pub upload_dir: PathBuf,
}

impl AppState {
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        self.pipeline.store()
    }

    pub fn predictor(&self) -> &Arc<dyn RiskPredictor> {
        self.pipeline.predictor()
    }
}
