//! Risk prediction clients.

pub mod http;
pub mod mock;
pub mod trainer;

pub use http::HttpRiskPredictor;
pub use mock::MockPredictor;
pub use trainer::{TrainOutcome, Trainer};
