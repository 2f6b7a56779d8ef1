use std::sync::Arc;
use std::time::Instant;

use crate::auth::ApiKeyAuth;
use crate::external::ExternalApi;
use crate::rate_limit::{RateLimiter, RouteLimit};

// app's shared state
#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
    pub auth: Arc<ApiKeyAuth>,
    pub external: Arc<ExternalApi>,
    pub limits: RouteLimits,
}

// One limiter per route group, each with its own table
#[derive(Clone)]
pub struct RouteLimits {
    pub public: RouteLimit,
    pub protected: RouteLimit,
    pub ai: RouteLimit,
}

impl RouteLimits {
    pub fn new(public: u32, protected: u32, ai: u32) -> Self {
        Self {
            public: RouteLimit::new(Arc::new(RateLimiter::new()), public),
            protected: RouteLimit::new(Arc::new(RateLimiter::new()), protected),
            ai: RouteLimit::new(Arc::new(RateLimiter::new()), ai),
        }
    }

    // Handles for the background sweeper
    pub fn limiters(&self) -> Vec<Arc<RateLimiter>> {
        [&self.public, &self.protected, &self.ai]
            .into_iter()
            .map(|route| Arc::clone(&route.limiter))
            .collect()
    }
}

impl AppState {
    pub fn new(auth: ApiKeyAuth, external: ExternalApi, limits: RouteLimits) -> Self {
        Self {
            started_at: Instant::now(),
            auth: Arc::new(auth),
            external: Arc::new(external),
            limits,
        }
    }
}
