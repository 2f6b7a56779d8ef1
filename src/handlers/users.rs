use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::error::ApiResult;
use crate::metrics::REQUEST_TOTAL;
use crate::state::AppState;

// GET /api/protected/users - Auth0 user list
pub async fn users_handler(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    REQUEST_TOTAL.inc();

    let users = state.external.auth0_users().await?;
    let count = users.as_array().map_or(0, Vec::len);
    tracing::debug!(count, "fetched Auth0 users");

    Ok(Json(json!({ "users": users, "count": count })))
}
