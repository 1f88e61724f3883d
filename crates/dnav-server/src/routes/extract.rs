//! Extraction routes.
//! POST /api/extract runs one extraction; GET /api/extract/status reports
//! the model and limits in effect.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::warn;

use dnav_runtime::ExtractRequest;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/extract", post(extract))
        .route("/extract/status", get(get_status))
}

/// Only a structurally invalid request is rejected; every other outcome is
/// a 200 whose `meta.warnings` says what degraded.
async fn extract(State(state): State<Arc<AppState>>, body: String) -> Response {
    let request = match ExtractRequest::from_json(&body).and_then(ExtractRequest::validate) {
        Ok(r) => r,
        Err(e) => {
            warn!("Rejected extraction request: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response();
        }
    };

    let output = state
        .extractor
        .extract(&request.document, request.mode)
        .await;
    Json(output).into_response()
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.extractor.config();
    Json(serde_json::json!({
        "modelAvailable": state.extractor.model().is_some(),
        "model": state.extractor.model(),
        "llm": state.llm_status,
        "defaultMode": config.default_mode,
        "timeoutSecs": config.model_timeout.as_secs(),
        "maxCandidates": config.max_candidates,
    }))
}
