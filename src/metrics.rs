//! Prometheus metrics for the proxy
//!
//! Exposed in text format on `GET /metrics`.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Counter: cache lookups by result (hit/miss)
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec!(
        "profilecache_cache_operations_total",
        "Cache lookups by result",
        &["operation"]
    )
    .expect("Failed to create cache_operations metric");

    /// Counter: upstream fetches by outcome
    pub static ref UPSTREAM_FETCHES: CounterVec = register_counter_vec!(
        "profilecache_upstream_fetches_total",
        "Upstream profile fetches by outcome",
        &["outcome"]
    )
    .expect("Failed to create upstream_fetches metric");

    /// Histogram: upstream fetch latency (seconds)
    pub static ref UPSTREAM_DURATION: HistogramVec = register_histogram_vec!(
        "profilecache_upstream_duration_seconds",
        "Duration of upstream profile fetches",
        &["outcome"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to create upstream_duration metric");

    /// Counter: invalidations by whether an entry was removed
    pub static ref INVALIDATIONS: CounterVec = register_counter_vec!(
        "profilecache_invalidations_total",
        "Invalidation requests by result",
        &["removed"]
    )
    .expect("Failed to create invalidations metric");
}

pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

/// Record a finished upstream fetch; `outcome` is "ok" or an error kind
pub fn record_fetch(outcome: &str, duration_secs: f64) {
    UPSTREAM_FETCHES.with_label_values(&[outcome]).inc();
    UPSTREAM_DURATION
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

pub fn record_invalidation(removed: bool) {
    let label = if removed { "true" } else { "false" };
    INVALIDATIONS.with_label_values(&[label]).inc();
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}
