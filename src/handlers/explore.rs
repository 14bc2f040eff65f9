use axum::extract::State;
use axum::http::{HeaderMap, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::guest::authorize;
use super::parse_model_output;
use crate::error::{AppError, Result};
use crate::metrics::REQUEST_TOTAL;
use crate::models::ExploreRequest;
use crate::prompts;
use crate::state::AppState;

// POST /api/explore - destination guide
pub async fn explore_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Json(payload): Json<ExploreRequest>,
) -> Result<Response> {
    REQUEST_TOTAL.inc();
    let access = authorize(&state, &headers, &uri).await?;

    let start = Instant::now();
    let result = explore(&state, &payload).await;
    tracing::info!(
        destination = %payload.query,
        elapsed_ms = start.elapsed().as_millis() as u64,
        ok = result.is_ok(),
        "explore request finished"
    );

    Ok(access.decorate(result.into_response()))
}

async fn explore(state: &AppState, payload: &ExploreRequest) -> Result<Json<Value>> {
    if payload.query.trim().is_empty() {
        return Err(AppError::Validation("query is required".to_string()));
    }

    let response = state.generate(prompts::destination_guide(payload)).await?;
    let guide = parse_model_output(&response.response)?;
    Ok(Json(guide))
}
