mod auth;
mod client_key;
mod config;
mod error;
mod external;
mod handlers;
mod metrics;
mod models;
mod rate_limit;
mod routes;
mod state;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::auth::ApiKeyAuth;
use crate::config::Args;
use crate::external::ExternalApi;
use crate::state::{AppState, RouteLimits};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional, real environment wins
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flearn_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let secret = args.api_key_secret();
    if secret.is_none() {
        tracing::warn!("INTERNAL_API_KEY is not set: protected routes will reject every key");
    }

    let limits = RouteLimits::new(
        args.public_rate_limit,
        args.protected_rate_limit,
        args.ai_rate_limit,
    );

    if let Some(every) = args.sweep_every() {
        tokio::spawn(rate_limit::sweeper(limits.limiters(), every));
    }

    let state = AppState::new(
        ApiKeyAuth::new(secret),
        ExternalApi::new(args.external_api())?,
        limits,
    );
    let app = routes::build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("FLEARN backend listening on http://localhost:{}", args.port);
    tracing::info!(
        "Rate limits per minute: public {}, protected {}, ai {}",
        args.public_rate_limit,
        args.protected_rate_limit,
        args.ai_rate_limit
    );
    axum::serve(listener, app).await?;

    Ok(())
}
