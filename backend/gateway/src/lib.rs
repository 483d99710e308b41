//! DPRScope HTTP API.
//!
//! Routes for uploading DPRs, reading review results, attaching feedback,
//! free-text analysis and the ML predictor passthrough.

pub mod error;
pub mod routes;
pub mod server;
pub mod state;
pub mod upload;

pub use error::ApiError;
pub use server::{build_router, serve, RouterOptions};
pub use state::AppState;
