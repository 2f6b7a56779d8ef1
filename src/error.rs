//! HTTP-facing error type.
//!
//! Every failure reaching a client is rendered as
//! `{ "error": <title>, "message": <detail> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::external::ExternalApiError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("API key required")]
    MissingApiKey,

    #[error("invalid API key")]
    InvalidApiKey,

    #[error("rate limit exceeded (max {limit} per minute)")]
    RateLimitExceeded { limit: u32 },

    #[error("request body too large")]
    PayloadTooLarge,

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    External(#[from] ExternalApiError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            ApiError::MissingApiKey => (
                StatusCode::UNAUTHORIZED,
                "API key required",
                "Please provide an API key in headers (x-api-key) or query params (api_key)"
                    .to_string(),
            ),
            ApiError::InvalidApiKey => (
                StatusCode::FORBIDDEN,
                "Invalid API key",
                "The provided API key is not valid".to_string(),
            ),
            ApiError::RateLimitExceeded { limit } => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded",
                format!("Maximum {limit} requests per minute allowed"),
            ),
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Payload too large",
                "Request body exceeds the 1 MiB limit".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg.clone()),
            ApiError::External(ExternalApiError::NotConfigured(service)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service not configured",
                format!("{service} credentials not configured"),
            ),
            ApiError::External(e) => {
                tracing::error!("Upstream call failed: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream request failed",
                    e.to_string(),
                )
            }
            ApiError::Internal(msg) => {
                // real cause stays in the server log
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    "Something went wrong".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
