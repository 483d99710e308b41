pub mod content;
pub mod error;
pub mod features;
pub mod scoring;
pub mod traits;
pub mod types;

pub use error::{DprError, DprResult};
pub use features::FeatureSet;
pub use scoring::overall_score;
pub use traits::{FeatureExtractor, RecordStore, RiskPredictor, TextAnalyzer};
pub use types::{
    Analysis, Completion, Decision, DprRecord, DprStatus, ExtractionResult, Failure, RecordQuery,
    RiskLevel, RiskPrediction, TextAnalysis,
};
