use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::client_key::{ClientKey, resolve_api_key};
use crate::error::ApiError;
use crate::metrics::{RATE_LIMITED_TOTAL, TRACKED_KEYS};

// Width of the sliding window in milliseconds
pub const WINDOW_MS: i64 = 60_000;

// Per-route limit when registration code does not pass one
pub const DEFAULT_LIMIT: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admitted,
    Rejected,
}

impl Decision {
    pub fn is_admitted(self) -> bool {
        matches!(self, Decision::Admitted)
    }
}

/// Sliding-window limiter keyed by client identity.
///
/// Every key maps to the timestamps (ms since epoch) of its admitted requests,
/// oldest first. The DashMap entry guard holds the shard lock for the whole
/// prune/check/append sequence, so two callers racing on one key can never
/// both take the last slot.
#[derive(Default)]
pub struct RateLimiter {
    logs: DashMap<String, VecDeque<i64>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, key: &str, limit: u32, now: i64) -> Decision {
        let mut log = self.logs.entry(key.to_string()).or_default();

        prune(&mut log, now - WINDOW_MS);

        if log.len() >= limit as usize {
            return Decision::Rejected;
        }

        log.push_back(now);
        Decision::Admitted
    }

    // Drop keys whose log is empty once expired entries are gone.
    // An empty log admits exactly like an unseen key, so this never changes a decision.
    pub fn sweep(&self, now: i64) -> usize {
        let cutoff = now - WINDOW_MS;
        let before = self.logs.len();
        self.logs.retain(|_, log| {
            prune(log, cutoff);
            !log.is_empty()
        });
        before.saturating_sub(self.logs.len())
    }

    pub fn tracked_keys(&self) -> usize {
        self.logs.len()
    }
}

// Timestamps strictly older than the cutoff fall out of the window
fn prune(log: &mut VecDeque<i64>, cutoff: i64) {
    while log.front().is_some_and(|&ts| ts < cutoff) {
        log.pop_front();
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// State handed to the middleware for one route group
#[derive(Clone)]
pub struct RouteLimit {
    pub limiter: Arc<RateLimiter>,
    pub limit: u32,
}

impl RouteLimit {
    pub fn new(limiter: Arc<RateLimiter>, limit: u32) -> Self {
        Self { limiter, limit }
    }
}

pub async fn enforce_rate_limit(
    State(route): State<RouteLimit>,
    req: Request,
    next: Next,
) -> Response {
    let (api_key, req) = match resolve_api_key(req).await {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };
    let key = ClientKey::from_api_key(api_key);

    let decision = route.limiter.evaluate(key.as_str(), route.limit, now_millis());
    if !decision.is_admitted() {
        RATE_LIMITED_TOTAL.inc();
        tracing::warn!(client = %key, limit = route.limit, "rate limit exceeded");
        return ApiError::RateLimitExceeded { limit: route.limit }.into_response();
    }

    next.run(req).await
}

// Periodic sweep of idle keys across every limiter the server owns
pub async fn sweeper(limiters: Vec<Arc<RateLimiter>>, every: std::time::Duration) {
    let mut interval = tokio::time::interval(every);
    tracing::info!("Rate limit sweeper started (interval: {:?})", every);

    loop {
        interval.tick().await;

        let now = now_millis();
        let mut removed = 0;
        let mut tracked = 0;
        for limiter in &limiters {
            removed += limiter.sweep(now);
            tracked += limiter.tracked_keys();
        }
        TRACKED_KEYS.set(tracked as f64);

        if removed > 0 {
            tracing::debug!(removed, tracked, "swept idle rate limit keys");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const SEC: i64 = 1_000;

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let rl = RateLimiter::new();
        assert_eq!(rl.evaluate("A", 3, 0), Decision::Admitted);
        assert_eq!(rl.evaluate("A", 3, 10 * SEC), Decision::Admitted);
        assert_eq!(rl.evaluate("A", 3, 20 * SEC), Decision::Admitted);
        assert_eq!(rl.evaluate("A", 3, 30 * SEC), Decision::Rejected);
    }

    #[test]
    fn window_slides_instead_of_resetting() {
        let rl = RateLimiter::new();
        for t in [0, 10, 20] {
            assert!(rl.evaluate("A", 3, t * SEC).is_admitted());
        }
        assert_eq!(rl.evaluate("A", 3, 30 * SEC), Decision::Rejected);

        // only the request at t=0 has left the window
        assert_eq!(rl.evaluate("A", 3, 61 * SEC), Decision::Admitted);
        assert_eq!(rl.evaluate("A", 3, 62 * SEC), Decision::Rejected);
    }

    #[test]
    fn rejected_requests_are_not_recorded() {
        let rl = RateLimiter::new();
        assert!(rl.evaluate("A", 1, 0).is_admitted());
        for t in 1..50 {
            assert_eq!(rl.evaluate("A", 1, t * SEC), Decision::Rejected);
        }
        // if rejections were logged the key would still be blocked here
        assert!(rl.evaluate("A", 1, 60 * SEC + 1).is_admitted());
    }

    #[test]
    fn entry_exactly_at_window_edge_still_counts() {
        let rl = RateLimiter::new();
        assert!(rl.evaluate("A", 1, 0).is_admitted());
        assert_eq!(rl.evaluate("A", 1, WINDOW_MS), Decision::Rejected);
        assert_eq!(rl.evaluate("A", 1, WINDOW_MS + 1), Decision::Admitted);
    }

    #[test]
    fn zero_limit_rejects_everything() {
        let rl = RateLimiter::new();
        assert_eq!(rl.evaluate("A", 0, 0), Decision::Rejected);
        assert_eq!(rl.evaluate("fresh", 0, 5 * SEC), Decision::Rejected);
        assert_eq!(rl.evaluate("A", 0, 500 * SEC), Decision::Rejected);
    }

    #[test]
    fn keys_are_isolated() {
        let rl = RateLimiter::new();
        assert!(rl.evaluate("a", 1, 0).is_admitted());
        assert_eq!(rl.evaluate("a", 1, 1), Decision::Rejected);
        assert!(rl.evaluate("b", 1, 2).is_admitted());
        assert_eq!(rl.evaluate("a", 1, 3), Decision::Rejected);
    }

    #[test]
    fn separate_limiters_do_not_share_state() {
        let public = RateLimiter::new();
        let protected = RateLimiter::new();
        assert!(public.evaluate("k", 1, 0).is_admitted());
        assert!(protected.evaluate("k", 1, 0).is_admitted());
        assert_eq!(public.evaluate("k", 1, 1), Decision::Rejected);
    }

    #[test]
    fn never_exceeds_limit_in_any_window() {
        let rl = RateLimiter::new();
        let limit = 5;
        let mut admitted = Vec::new();
        // one request every 7 seconds for ~10 minutes
        for i in 0..90 {
            let now = i * 7 * SEC;
            if rl.evaluate("A", limit, now).is_admitted() {
                admitted.push(now);
            }
        }
        for &start in &admitted {
            let in_window = admitted
                .iter()
                .filter(|&&t| t >= start && t <= start + WINDOW_MS)
                .count();
            assert!(in_window <= limit as usize);
        }
    }

    #[test]
    fn concurrent_callers_never_over_admit() {
        let rl = Arc::new(RateLimiter::new());
        let limit = 50;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rl = Arc::clone(&rl);
                thread::spawn(move || {
                    (0..100)
                        .filter(|_| rl.evaluate("shared", limit, 1_000).is_admitted())
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, limit as usize);
    }

    #[test]
    fn sweep_removes_only_idle_keys() {
        let rl = RateLimiter::new();
        rl.evaluate("idle", 10, 0);
        rl.evaluate("active", 10, 0);
        rl.evaluate("active", 10, 50 * SEC);

        assert_eq!(rl.sweep(70 * SEC), 1);
        assert_eq!(rl.tracked_keys(), 1);

        // the surviving log still holds its in-window entry
        assert!(rl.evaluate("active", 2, 70 * SEC).is_admitted());
        assert_eq!(rl.evaluate("active", 2, 71 * SEC), Decision::Rejected);
    }
}
