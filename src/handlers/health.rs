use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// GET / - banner
pub async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "message": "FLEARN Backend API is running!",
        "version": VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// GET /health - liveness probe with process uptime
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
