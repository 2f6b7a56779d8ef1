use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::client_key::resolve_api_key;
use crate::error::ApiError;
use crate::metrics::AUTH_FAILURES;

/// Checks supplied keys against the single configured secret.
///
/// With no secret configured nothing can match: required auth forbids every
/// key and optional auth never marks a request authenticated.
#[derive(Debug, Clone, Default)]
pub struct ApiKeyAuth {
    secret: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    pub fn is_valid(&self, key: &str) -> bool {
        match &self.secret {
            Some(secret) => key.as_bytes().ct_eq(secret.as_bytes()).into(),
            None => false,
        }
    }

    pub fn verify(&self, key: Option<&str>) -> Result<(), ApiError> {
        match key {
            None => Err(ApiError::MissingApiKey),
            Some(key) if self.is_valid(key) => Ok(()),
            Some(_) => Err(ApiError::InvalidApiKey),
        }
    }
}

// Set by `optional_api_key` for handlers that branch on it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated(pub bool);

pub async fn require_api_key(
    State(auth): State<Arc<ApiKeyAuth>>,
    req: Request,
    next: Next,
) -> Response {
    let (api_key, req) = match resolve_api_key(req).await {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = auth.verify(api_key.as_deref()) {
        let reason = match e {
            ApiError::MissingApiKey => "missing",
            _ => "invalid",
        };
        AUTH_FAILURES.with_label_values(&[reason]).inc();
        tracing::warn!(path = %req.uri().path(), reason, "rejected request: API key check failed");
        return e.into_response();
    }

    next.run(req).await
}

pub async fn optional_api_key(
    State(auth): State<Arc<ApiKeyAuth>>,
    req: Request,
    next: Next,
) -> Response {
    let (api_key, mut req) = match resolve_api_key(req).await {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };

    // anything short of an exact match, including a missing key, is unauthenticated
    let authenticated = api_key.as_deref().is_some_and(|key| auth.is_valid(key));
    req.extensions_mut().insert(Authenticated(authenticated));

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_unauthorized() {
        let auth = ApiKeyAuth::new(Some("s3cret".into()));
        assert!(matches!(auth.verify(None), Err(ApiError::MissingApiKey)));
    }

    #[test]
    fn wrong_key_is_forbidden() {
        let auth = ApiKeyAuth::new(Some("s3cret".into()));
        assert!(matches!(auth.verify(Some("s3cre")), Err(ApiError::InvalidApiKey)));
        assert!(matches!(auth.verify(Some("s3cret ")), Err(ApiError::InvalidApiKey)));
    }

    #[test]
    fn exact_key_is_admitted() {
        let auth = ApiKeyAuth::new(Some("s3cret".into()));
        assert!(auth.verify(Some("s3cret")).is_ok());
    }

    #[test]
    fn unconfigured_secret_forbids_every_key() {
        let auth = ApiKeyAuth::default();
        assert!(matches!(auth.verify(Some("anything")), Err(ApiError::InvalidApiKey)));
        assert!(matches!(auth.verify(None), Err(ApiError::MissingApiKey)));
        assert!(!auth.is_valid(""));
    }
}
