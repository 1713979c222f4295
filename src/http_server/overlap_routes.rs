//! Overlap HTTP Routes
//!
//! `POST /_overlap` takes the request parameters as a URL-encoded form
//! body; `GET /_overlap` takes them from the query string. The body is
//! decoded whatever its `Content-Type` says, and every decode failure
//! answers with the structured error body.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, RawQuery, State},
    routing::post,
    Json, Router,
};
use tracing::{error, warn};

use crate::join::{JoinOrchestrator, OverlapError, OverlapResult};
use crate::response::OverlapResponse;

// ==================
// Shared State
// ==================

/// Overlap state shared across handlers
pub struct OverlapState {
    pub orchestrator: JoinOrchestrator,
    pub request_timeout: Duration,
}

impl OverlapState {
    pub fn new(orchestrator: JoinOrchestrator, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            request_timeout,
        }
    }
}

// ==================
// Routes
// ==================

pub fn overlap_routes(state: Arc<OverlapState>) -> Router {
    Router::new()
        .route("/_overlap", post(overlap_form_handler).get(overlap_query_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

async fn overlap_form_handler(
    State(state): State<Arc<OverlapState>>,
    body: Result<Bytes, BytesRejection>,
) -> OverlapResult<Json<OverlapResponse>> {
    let body = body.map_err(|e| OverlapError::invalid_param("body", e.body_text()))?;
    let params = decode_params("body", &body)?;
    run_overlap(&state, params).await
}

async fn overlap_query_handler(
    State(state): State<Arc<OverlapState>>,
    RawQuery(query): RawQuery,
) -> OverlapResult<Json<OverlapResponse>> {
    let params = decode_params("query", query.unwrap_or_default().as_bytes())?;
    run_overlap(&state, params).await
}

/// Decode `application/x-www-form-urlencoded` pairs
fn decode_params(source: &str, raw: &[u8]) -> OverlapResult<HashMap<String, String>> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| OverlapError::invalid_param(source, format!("not valid UTF-8: {}", e)))?;
    serde_urlencoded::from_str(text).map_err(|e| OverlapError::invalid_param(source, e.to_string()))
}

/// Run one request under the configured deadline. On timeout the join
/// fan-out is dropped and nothing partial is returned.
async fn run_overlap(state: &OverlapState, params: HashMap<String, String>) -> OverlapResult<Json<OverlapResponse>> {
    let result = tokio::time::timeout(state.request_timeout, state.orchestrator.handle(&params))
        .await
        .unwrap_or(Err(OverlapError::Timeout(state.request_timeout)));

    match result {
        Ok(response) => Ok(Json(response)),
        Err(e) if e.is_client_error() => {
            warn!(code = e.code(), error = %e, "overlap request rejected");
            Err(e)
        }
        Err(e) => {
            error!(code = e.code(), error = %e, "overlap request failed");
            Err(e)
        }
    }
}
