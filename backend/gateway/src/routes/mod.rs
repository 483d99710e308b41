pub mod dpr;
pub mod ml;

use axum::Json;
use serde_json::{json, Value};

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dprscope",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
