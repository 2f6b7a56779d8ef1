use axum::{Json, extract::State};
use serde_json::Value;
use std::time::Instant;

use crate::error::{ApiError, ApiResult};
use crate::metrics::REQUEST_TOTAL;
use crate::models::GenerateRequest;
use crate::state::AppState;

// POST /api/protected/ai/generate - single prompt completion via OpenAI
pub async fn generate_handler(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> ApiResult<Json<Value>> {
    REQUEST_TOTAL.inc();

    if payload.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("prompt must not be empty".to_string()));
    }

    let start_time = Instant::now();
    let completion = state
        .external
        .generate_text(&payload.prompt, &payload.options)
        .await?;
    tracing::debug!(elapsed = ?start_time.elapsed(), "text generation finished");

    Ok(Json(completion))
}
