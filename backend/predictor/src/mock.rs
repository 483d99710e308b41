use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{json, Value};

use dprscope_core::{DprError, DprResult, FeatureSet, RiskPredictor};

/// A predictor that returns a canned response, or fails on demand.
pub struct MockPredictor {
    response: Value,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockPredictor {
    pub fn new() -> Self {
        Self {
            response: json!({"decision": "review", "level": "Medium", "reasons": []}),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: Value) -> Self {
        self.response = response;
        self
    }

    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPredictor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RiskPredictor for MockPredictor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn predict_raw(&self, _features: &FeatureSet) -> DprResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(DprError::PredictionFailed(message.clone())),
            None => Ok(self.response.clone()),
        }
    }
}
