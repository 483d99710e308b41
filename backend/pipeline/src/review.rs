//! Upload-to-decision orchestration.
//!
//! A record is created in `processing`, both extractors run concurrently,
//! their features are merged and sent to the predictor, and the record is
//! finalized exactly once: `done` with every result field, or `failed` with
//! the reason and whatever extraction output was obtained.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use dprscope_core::{
    overall_score, Analysis, Completion, DprError, DprRecord, DprResult, ExtractionResult,
    Failure, FeatureExtractor, FeatureSet, RecordStore, RiskPredictor,
};
use dprscope_logging::{EventLogger, PipelineEvent, PipelineStage};

/// A review that did not reach `done`.
///
/// `record_id` is the persisted `failed` record, or `None` when the
/// placeholder itself could not be created.
#[derive(Debug, Error)]
#[error("DPR review failed: {source}")]
pub struct PipelineFailure {
    pub record_id: Option<Uuid>,
    pub source: DprError,
}

pub struct ReviewPipeline {
    store: Arc<dyn RecordStore>,
    text: Arc<dyn FeatureExtractor>,
    image: Arc<dyn FeatureExtractor>,
    predictor: Arc<dyn RiskPredictor>,
}

impl ReviewPipeline {
    pub fn new(
        store: Arc<dyn RecordStore>,
        text: Arc<dyn FeatureExtractor>,
        image: Arc<dyn FeatureExtractor>,
        predictor: Arc<dyn RiskPredictor>,
    ) -> Self {
        Self {
            store,
            text,
            image,
            predictor,
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn predictor(&self) -> &Arc<dyn RiskPredictor> {
        &self.predictor
    }

    /// Run the full review for a staged upload.
    #[instrument(skip(self, path), fields(record_id = tracing::field::Empty))]
    pub async fn process(&self, filename: &str, path: &Path) -> Result<DprRecord, PipelineFailure> {
        let record = self.store.create(filename).await.map_err(|source| {
            error!(error = %source, "Could not create DPR record");
            PipelineFailure {
                record_id: None,
                source,
            }
        })?;
        let id = record.id;
        tracing::Span::current().record("record_id", tracing::field::display(id));
        EventLogger::log_event(
            id,
            PipelineEvent::Received {
                filename: filename.to_string(),
            },
        );

        let (text, image) = tokio::join!(
            self.extract(id, PipelineStage::TextExtraction, self.text.as_ref(), path),
            self.extract(id, PipelineStage::ImageExtraction, self.image.as_ref(), path),
        );

        let (text, image) = match (text, image) {
            (Ok(text), Ok(image)) => (text, image),
            (Err(e), Ok(image)) => {
                let partial = Analysis {
                    image: Some(image),
                    ..Default::default()
                };
                return Err(self.abort(id, e.to_string(), e, Some(partial)).await);
            }
            (Ok(text), Err(e)) => {
                let partial = Analysis {
                    text: Some(text),
                    ..Default::default()
                };
                return Err(self.abort(id, e.to_string(), e, Some(partial)).await);
            }
            (Err(text_err), Err(image_err)) => {
                let reason = format!("{text_err}; {image_err}");
                let source = DprError::upstream("extractors", &reason);
                return Err(self.abort(id, reason, source, None).await);
            }
        };

        let features = FeatureSet::merged(&text.features, &image.features);
        let start = Instant::now();
        let prediction = match self.predictor.predict(&features).await {
            Ok(prediction) => {
                EventLogger::log_event(
                    id,
                    PipelineEvent::StageCompleted {
                        stage: PipelineStage::Prediction,
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    },
                );
                prediction
            }
            Err(e) => {
                EventLogger::log_event(
                    id,
                    PipelineEvent::StageFailed {
                        stage: PipelineStage::Prediction,
                        error_msg: e.to_string(),
                    },
                );
                let partial = Analysis {
                    text: Some(text),
                    image: Some(image),
                    risk: None,
                };
                return Err(self.abort(id, e.to_string(), e, Some(partial)).await);
            }
        };

        let completion = Completion {
            decision: prediction.decision,
            risk_level: prediction.level,
            overall_score: overall_score(text.score, image.score),
            feedback: prediction.feedback(),
            analysis: Analysis {
                text: Some(text),
                image: Some(image),
                risk: Some(prediction),
            },
        };

        match self.store.complete(id, &completion).await {
            Ok(record) => {
                EventLogger::log_event(
                    id,
                    PipelineEvent::Completed {
                        decision: completion.decision.to_string(),
                        risk_level: completion.risk_level.to_string(),
                        overall_score: completion.overall_score,
                    },
                );
                info!(
                    decision = %completion.decision,
                    risk_level = %completion.risk_level,
                    overall_score = completion.overall_score,
                    "DPR review completed"
                );
                Ok(record)
            }
            Err(e) => {
                EventLogger::log_event(
                    id,
                    PipelineEvent::StageFailed {
                        stage: PipelineStage::Aggregation,
                        error_msg: e.to_string(),
                    },
                );
                Err(self.abort(id, e.to_string(), e, Some(completion.analysis)).await)
            }
        }
    }

    /// Replace the human feedback on a record.
    pub async fn submit_feedback(&self, id: Uuid, feedback: &str) -> DprResult<DprRecord> {
        let record = self.store.set_feedback(id, feedback).await?;
        EventLogger::log_event(
            id,
            PipelineEvent::FeedbackUpdated {
                length: feedback.chars().count(),
            },
        );
        Ok(record)
    }

    async fn extract(
        &self,
        id: Uuid,
        stage: PipelineStage,
        extractor: &dyn FeatureExtractor,
        path: &Path,
    ) -> DprResult<ExtractionResult> {
        let start = Instant::now();
        match extractor.extract(path).await {
            Ok(result) => {
                EventLogger::log_event(
                    id,
                    PipelineEvent::StageCompleted {
                        stage,
                        elapsed_ms: start.elapsed().as_millis() as u64,
                    },
                );
                Ok(result)
            }
            Err(e) => {
                warn!(extractor = extractor.name(), error = %e, "Extraction failed");
                EventLogger::log_event(
                    id,
                    PipelineEvent::StageFailed {
                        stage,
                        error_msg: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    /// Move the record to `failed`. A store error here is logged, not returned,
    /// so the caller still sees the error that stopped the review.
    async fn abort(
        &self,
        id: Uuid,
        reason: String,
        source: DprError,
        partial: Option<Analysis>,
    ) -> PipelineFailure {
        let failure = Failure { reason, partial };
        if let Err(e) = self.store.fail(id, &failure).await {
            error!(record_id = %id, error = %e, "Could not mark DPR record as failed");
        } else {
            warn!(record_id = %id, reason = %failure.reason, "DPR review failed");
        }
        PipelineFailure {
            record_id: Some(id),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tokio::sync::Barrier;

    use dprscope_core::{Decision, DprStatus, RiskLevel};
    use dprscope_predictor::MockPredictor;
    use dprscope_store::InMemoryStore;

    struct StaticExtractor {
        name: &'static str,
        result: Result<ExtractionResult, String>,
        barrier: Option<Arc<Barrier>>,
    }

    impl StaticExtractor {
        fn ok(name: &'static str, features: FeatureSet, score: Option<f64>) -> Self {
            Self {
                name,
                result: Ok(ExtractionResult { features, score }),
                barrier: None,
            }
        }

        fn failing(name: &'static str, message: &str) -> Self {
            Self {
                name,
                result: Err(message.to_string()),
                barrier: None,
            }
        }

        fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
            self.barrier = Some(barrier);
            self
        }
    }

    #[async_trait]
    impl FeatureExtractor for StaticExtractor {
        fn name(&self) -> &str {
            self.name
        }

        async fn extract(&self, _path: &Path) -> DprResult<ExtractionResult> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            self.result
                .clone()
                .map_err(|m| DprError::upstream(format!("{}-extractor", self.name), m))
        }
    }

    /// Records the features it was asked to score.
    struct CapturingPredictor {
        seen: Mutex<Option<FeatureSet>>,
    }

    #[async_trait]
    impl RiskPredictor for CapturingPredictor {
        fn name(&self) -> &str {
            "capturing"
        }

        async fn predict_raw(&self, features: &FeatureSet) -> DprResult<Value> {
            *self.seen.lock().unwrap() = Some(features.clone());
            Ok(json!({"prediction": "Low"}))
        }
    }

    fn text_ok() -> StaticExtractor {
        StaticExtractor::ok("text", FeatureSet::new().with("page_count", 12), Some(0.8))
    }

    fn image_ok() -> StaticExtractor {
        StaticExtractor::ok("image", FeatureSet::new().with("image_count", 3), Some(0.6))
    }

    fn pipeline(
        store: &InMemoryStore,
        text: StaticExtractor,
        image: StaticExtractor,
        predictor: Arc<dyn RiskPredictor>,
    ) -> ReviewPipeline {
        ReviewPipeline::new(
            Arc::new(store.clone()),
            Arc::new(text),
            Arc::new(image),
            predictor,
        )
    }

    fn upload() -> PathBuf {
        PathBuf::from("uploads/report.pdf")
    }

    #[tokio::test]
    async fn test_successful_review() {
        let store = InMemoryStore::new();
        let predictor = MockPredictor::new().with_response(json!({
            "decision": "reject",
            "level": "High",
            "reasons": ["Unrealistic timeline", "Insufficient EIA"]
        }));
        let p = pipeline(&store, text_ok(), image_ok(), Arc::new(predictor));

        let record = p.process("report.pdf", &upload()).await.unwrap();
        assert_eq!(record.status, DprStatus::Done);
        assert_eq!(record.decision, Some(Decision::Reject));
        assert_eq!(record.risk_level, Some(RiskLevel::High));
        assert_eq!(record.overall_score, Some(70));
        assert_eq!(
            record.feedback.as_deref(),
            Some("Unrealistic timeline; Insufficient EIA")
        );

        let analysis = record.analysis.as_ref().unwrap();
        assert!(analysis.text.is_some());
        assert!(analysis.image.is_some());
        assert!(analysis.risk.is_some());

        let stored = store.get(record.id).await.unwrap().unwrap();
        assert_eq!(stored, record);
    }

    #[tokio::test]
    async fn test_missing_sub_score_counts_as_zero() {
        let store = InMemoryStore::new();
        let image = StaticExtractor::ok("image", FeatureSet::new(), None);
        let p = pipeline(&store, text_ok(), image, Arc::new(MockPredictor::new()));

        let record = p.process("report.pdf", &upload()).await.unwrap();
        assert_eq!(record.overall_score, Some(40));
    }

    #[tokio::test]
    async fn test_predictor_failure_marks_failed_and_keeps_extraction() {
        let store = InMemoryStore::new();
        let predictor = MockPredictor::new().failing("connection refused");
        let p = pipeline(&store, text_ok(), image_ok(), Arc::new(predictor));

        let failure = p.process("report.pdf", &upload()).await.unwrap_err();
        assert!(matches!(failure.source, DprError::PredictionFailed(_)));

        let id = failure.record_id.unwrap();
        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.status, DprStatus::Failed);
        assert!(record.decision.is_none());
        assert!(record.overall_score.is_none());
        assert!(record.error.unwrap().contains("connection refused"));

        let analysis = record.analysis.unwrap();
        assert!(analysis.text.is_some());
        assert!(analysis.image.is_some());
        assert!(analysis.risk.is_none());
    }

    #[tokio::test]
    async fn test_extractor_failure_skips_prediction() {
        let store = InMemoryStore::new();
        let predictor = Arc::new(MockPredictor::new());
        let p = pipeline(
            &store,
            StaticExtractor::failing("text", "unreadable PDF"),
            image_ok(),
            predictor.clone(),
        );

        let failure = p.process("report.pdf", &upload()).await.unwrap_err();
        assert!(matches!(failure.source, DprError::Upstream { .. }));
        assert_eq!(predictor.calls(), 0);

        let record = store.get(failure.record_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(record.status, DprStatus::Failed);
        let analysis = record.analysis.unwrap();
        assert!(analysis.text.is_none());
        assert!(analysis.image.is_some());
    }

    #[tokio::test]
    async fn test_both_extractors_fail() {
        let store = InMemoryStore::new();
        let p = pipeline(
            &store,
            StaticExtractor::failing("text", "timeout"),
            StaticExtractor::failing("image", "bad stream"),
            Arc::new(MockPredictor::new()),
        );

        let failure = p.process("report.pdf", &upload()).await.unwrap_err();
        let record = store.get(failure.record_id.unwrap()).await.unwrap().unwrap();
        let reason = record.error.unwrap();
        assert!(reason.contains("text-extractor"));
        assert!(reason.contains("image-extractor"));
        assert!(record.analysis.is_none());
    }

    #[tokio::test]
    async fn test_extractors_run_concurrently() {
        // Each extractor waits for the other; sequential execution would never finish.
        let barrier = Arc::new(Barrier::new(2));
        let store = InMemoryStore::new();
        let p = pipeline(
            &store,
            text_ok().with_barrier(barrier.clone()),
            image_ok().with_barrier(barrier),
            Arc::new(MockPredictor::new()),
        );

        let record = tokio::time::timeout(Duration::from_secs(5), p.process("report.pdf", &upload()))
            .await
            .expect("extractors were not run concurrently")
            .unwrap();
        assert_eq!(record.status, DprStatus::Done);
    }

    #[tokio::test]
    async fn test_image_features_win_on_collision() {
        let store = InMemoryStore::new();
        let predictor = Arc::new(CapturingPredictor {
            seen: Mutex::new(None),
        });
        let text = StaticExtractor::ok(
            "text",
            FeatureSet::new().with("quality", "text").with("pages", 4),
            Some(0.5),
        );
        let image = StaticExtractor::ok("image", FeatureSet::new().with("quality", "image"), Some(0.5));
        let p = pipeline(&store, text, image, predictor.clone());

        let record = p.process("report.pdf", &upload()).await.unwrap();
        assert_eq!(record.decision, Some(Decision::Approve));

        let seen = predictor.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.get("quality"), Some(&json!("image")));
        assert_eq!(seen.get("pages"), Some(&json!(4)));
    }

    #[tokio::test]
    async fn test_feedback_replaces_existing_text() {
        let store = InMemoryStore::new();
        let p = pipeline(&store, text_ok(), image_ok(), Arc::new(MockPredictor::new()));
        let record = p.process("report.pdf", &upload()).await.unwrap();

        p.submit_feedback(record.id, "first pass").await.unwrap();
        let updated = p.submit_feedback(record.id, "Budget revised").await.unwrap();
        assert_eq!(updated.feedback.as_deref(), Some("Budget revised"));
        assert_eq!(updated.status, DprStatus::Done);
    }

    #[tokio::test]
    async fn test_feedback_for_unknown_record() {
        let store = InMemoryStore::new();
        let p = pipeline(&store, text_ok(), image_ok(), Arc::new(MockPredictor::new()));

        let err = p.submit_feedback(Uuid::new_v4(), "hello").await.unwrap_err();
        assert!(matches!(err, DprError::NotFound(_)));
        assert!(store.is_empty().await);
    }
}
