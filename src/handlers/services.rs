use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::metrics::REQUEST_TOTAL;
use crate::models::ServiceCallRequest;
use crate::state::AppState;

// POST /api/protected/services/{name} - forward a payload to a key-authenticated service
pub async fn service_call_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(call): Json<ServiceCallRequest>,
) -> ApiResult<Json<Value>> {
    REQUEST_TOTAL.inc();

    let endpoint = url::Url::parse(&call.endpoint)
        .map_err(|e| ApiError::BadRequest(format!("invalid endpoint: {e}")))?;
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ApiError::BadRequest(
            "endpoint must be an http(s) URL".to_string(),
        ));
    }

    tracing::info!(service = %name, host = endpoint.host_str().unwrap_or_default(), "calling external service");
    let reply = state
        .external
        .call_service(endpoint.as_str(), &call.service_key, &call.data)
        .await?;

    Ok(Json(reply))
}
