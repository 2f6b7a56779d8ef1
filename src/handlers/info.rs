use axum::{Extension, Json};
use serde_json::{Value, json};

use crate::auth::Authenticated;
use crate::metrics::REQUEST_TOTAL;

use super::health::VERSION;

// GET /api/public/info - open to everyone, richer for authenticated callers
pub async fn public_info_handler(
    Extension(Authenticated(authenticated)): Extension<Authenticated>,
) -> Json<Value> {
    REQUEST_TOTAL.inc();

    let mut body = json!({
        "message": "Public endpoint - API key optional",
        "authenticated": authenticated,
        "version": VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    if authenticated {
        body["endpoints"] = json!([
            "GET /api/protected/users",
            "POST /api/protected/ai/generate",
            "POST /api/protected/services/{name}"
        ]);
    }

    Json(body)
}
