pub mod analyzer;
pub mod review;

pub use analyzer::KeywordAnalyzer;
pub use review::{PipelineFailure, ReviewPipeline};
