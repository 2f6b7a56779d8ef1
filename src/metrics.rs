use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Gauge, Histogram, register_counter, register_counter_vec,
    register_gauge, register_histogram,
};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("flearn_requests_total", "Total number of API requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("flearn_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref AUTH_FAILURES: CounterVec = register_counter_vec!(
        "flearn_auth_failures_total",
        "Requests rejected by API key authentication",
        &["reason"]
    )
    .unwrap();
    pub static ref TRACKED_KEYS: Gauge =
        register_gauge!("flearn_rate_limit_tracked_keys", "Client keys currently held by rate limiters").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "flearn_upstream_latency_seconds",
        "Latency of calls to third-party APIs in seconds"
    )
    .unwrap();
}
