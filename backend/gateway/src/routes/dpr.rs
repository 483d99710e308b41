//! DPR upload, lookup, listing, feedback and free-text analysis.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use dprscope_core::{DprError, DprRecord, RecordQuery, RiskLevel};

use crate::error::ApiError;
use crate::state::AppState;
use crate::upload;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 200;

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("Invalid DPR id".into()))
}

/// `POST /api/dpr/upload`: stage the `file` field and run the review.
pub async fn upload_dpr(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DprRecord>, ApiError> {
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = upload::display_name(field.file_name());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        file = Some((name, bytes));
        break;
    }

    let Some((filename, bytes)) = file else {
        return Err(ApiError::BadRequest("No file uploaded".into()));
    };
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".into()));
    }

    let path = upload::stage(&state.upload_dir, &filename, &bytes).await?;
    info!(filename = %filename, size = bytes.len(), staged = %path.display(), "DPR upload received");

    // The review runs on its own task so a dropped connection cannot leave the
    // record in `processing` or the staged file on disk.
    let pipeline = Arc::clone(&state.pipeline);
    let review = tokio::spawn(async move {
        let outcome = pipeline.process(&filename, &path).await;
        upload::discard(&path).await;
        outcome
    });

    review
        .await
        .map_err(|e| ApiError::failed("DPR processing failed", e))?
        .map(Json)
        .map_err(|failure| ApiError::ReviewFailed {
            id: failure.record_id,
            detail: failure.source.to_string(),
        })
}

/// `GET /api/dpr/:id`
pub async fn get_dpr(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DprRecord>, ApiError> {
    let id = parse_id(&id)?;
    state
        .store()
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("DPR not found".into()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    risk_level: Option<String>,
    limit: Option<usize>,
}

/// `GET /api/dpr?riskLevel=&limit=`: newest records first.
pub async fn list_dprs(
    State(state): State<Arc<AppState>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let risk_level = params
        .risk_level
        .filter(|level| !level.is_empty() && !level.eq_ignore_ascii_case("all"))
        .map(|level| level.parse::<RiskLevel>())
        .transpose()?;
    let query = RecordQuery {
        risk_level,
        status: None,
        limit: params.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT),
    };
    let records = state.store().list(&query).await?;
    Ok(Json(json!({ "records": records })))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    feedback: Option<String>,
}

/// `POST /api/dpr/:id/feedback`: replace the record's feedback text.
pub async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_id(&id)?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let feedback = request
        .feedback
        .ok_or_else(|| ApiError::BadRequest("Missing feedback".into()))?;

    state.pipeline.submit_feedback(id, &feedback).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    dpr_text: Option<String>,
    structured_fields: Option<Value>,
}

fn analyze_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "success": false, "error": message }))).into_response()
}

/// `POST /api/dpr/analyze`: keyword review of raw DPR text.
pub async fn analyze_dpr(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let text = request.dpr_text.unwrap_or_default();
    if text.trim().is_empty() {
        return analyze_error(StatusCode::BAD_REQUEST, "Missing DPR text");
    }

    match state
        .analyzer
        .analyze(&text, request.structured_fields.as_ref())
        .await
    {
        Ok(analysis) => Json(json!({ "success": true, "analysis": analysis })).into_response(),
        Err(DprError::MissingInput(message)) => analyze_error(StatusCode::BAD_REQUEST, &message),
        Err(e) => {
            tracing::error!(error = %e, "DPR text analysis failed");
            analyze_error(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed")
        }
    }
}
