//! Router assembly and the HTTP listener.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::routes::{self, dpr, ml};
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct RouterOptions {
    /// Allowed browser origin; `*` allows any.
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    if origin == "*" {
        return Ok(layer.allow_origin(Any));
    }
    let origin = HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin '{origin}'"))?;
    Ok(layer.allow_origin(origin))
}

/// Build the Axum router with all API routes.
pub fn build_router(state: Arc<AppState>, options: &RouterOptions) -> Result<Router> {
    let router = Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/dpr", get(dpr::list_dprs))
        .route("/api/dpr/upload", post(dpr::upload_dpr))
        .route("/api/dpr/analyze", post(dpr::analyze_dpr))
        .route("/api/dpr/:id", get(dpr::get_dpr))
        .route("/api/dpr/:id/feedback", post(dpr::submit_feedback))
        .route("/api/ml/predict", post(ml::predict))
        .route("/api/ml/train", post(ml::train))
        .layer(DefaultBodyLimit::max(options.max_upload_bytes))
        .layer(cors_layer(&options.cors_origin)?)
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    Ok(router)
}

/// Serve `router` on `addr` until Ctrl+C.
#[instrument(skip(router))]
pub async fn serve(addr: SocketAddr, router: Router) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("DPRScope API listening on http://{}", addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}
