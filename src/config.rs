use clap::Parser;
use std::time::Duration;

use crate::external::{DEFAULT_OPENAI_BASE_URL, ExternalApiConfig};
use crate::rate_limit::DEFAULT_LIMIT;

// CLI argument structure, every flag can also come from the environment (or .env)
#[derive(Parser, Debug, Clone)]
#[command(name = "flearn-backend")]
#[command(about = "Backend API for the FLEARN learning platform")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 8099)]
    pub port: u16,

    // Secret compared against client API keys
    #[arg(long, env = "INTERNAL_API_KEY", hide_env_values = true)]
    pub internal_api_key: Option<String>,

    // Per-minute request limits, one per route group
    #[arg(long, env = "PUBLIC_RATE_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub public_rate_limit: u32,

    #[arg(long, env = "PROTECTED_RATE_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub protected_rate_limit: u32,

    #[arg(long, env = "AI_RATE_LIMIT", default_value_t = 10)]
    pub ai_rate_limit: u32,

    // Seconds between sweeps of idle rate limit keys (0 disables)
    #[arg(long, env = "RATE_LIMIT_SWEEP_SECS", default_value_t = 60)]
    pub sweep_interval: u64,

    #[arg(long, env = "AUTH0_DOMAIN")]
    pub auth0_domain: Option<String>,

    #[arg(long, env = "AUTH0_CLIENT_ID")]
    pub auth0_client_id: Option<String>,

    #[arg(long, env = "AUTH0_CLIENT_SECRET", hide_env_values = true)]
    pub auth0_client_secret: Option<String>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    // Timeout for outbound API calls in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout: u64,
}

impl Args {
    // Empty env values (e.g. `INTERNAL_API_KEY=` in .env) count as unset
    pub fn api_key_secret(&self) -> Option<String> {
        non_blank(&self.internal_api_key)
    }

    pub fn sweep_every(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }

    pub fn external_api(&self) -> ExternalApiConfig {
        ExternalApiConfig {
            auth0_domain: non_blank(&self.auth0_domain),
            auth0_client_id: non_blank(&self.auth0_client_id),
            auth0_client_secret: non_blank(&self.auth0_client_secret),
            openai_api_key: non_blank(&self.openai_api_key),
            openai_base_url: self.openai_base_url.clone(),
            timeout: Duration::from_secs(self.upstream_timeout),
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
