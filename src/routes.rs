use axum::{
    Router,
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{optional_api_key, require_api_key};
use crate::handlers::{
    generate_handler, health_handler, metrics_handler, public_info_handler, root_handler,
    service_call_handler, users_handler,
};
use crate::rate_limit::enforce_rate_limit;
use crate::state::AppState;

// Layers run outermost-first: each group is rate limited before its key is checked
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/info", get(public_info_handler))
        .layer(from_fn_with_state(state.auth.clone(), optional_api_key))
        .layer(from_fn_with_state(state.limits.public.clone(), enforce_rate_limit));

    let protected = Router::new()
        .route("/users", get(users_handler))
        .route("/services/{name}", post(service_call_handler))
        .layer(from_fn_with_state(state.auth.clone(), require_api_key))
        .layer(from_fn_with_state(state.limits.protected.clone(), enforce_rate_limit));

    let ai = Router::new()
        .route("/ai/generate", post(generate_handler))
        .layer(from_fn_with_state(state.auth.clone(), require_api_key))
        .layer(from_fn_with_state(state.limits.ai.clone(), enforce_rate_limit));

    // same as the permissive cors() default: any origin, common verbs
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .nest("/api/public", public)
        .nest("/api/protected", protected.merge(ai))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
