//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (dispatch outcomes, latency, cache traffic)
//! - Expose a Prometheus-compatible metrics endpoint
//! - Track per-cache and aggregate counters
//!
//! # Metrics
//! - `gateway_dispatch_total` (counter): dispatches by outcome
//! - `gateway_request_duration_seconds` (histogram): edge latency
//! - `gateway_cache_reads_total` (counter): lookups by cache and result
//! - `gateway_cache_writes_total` (counter): stored entries by cache
//! - `gateway_quota_exceeded_total` (counter): failed writes by cache
//! - `gateway_fetches_total` (counter): upstream fetches by outcome
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels for cache name, dispatch outcome, fetch outcome
//! - Histogram buckets left at exporter defaults

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and describe the metric set.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            tracing::info!(address = %addr, "Metrics endpoint listening");
        }
        Err(error) => {
            tracing::error!(%error, "Failed to install metrics exporter");
            return;
        }
    }

    metrics::describe_counter!(
        "gateway_dispatch_total",
        "Dispatched requests by outcome (handled, caught, no-route, failed)"
    );
    metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        "Wall-clock time spent handling a request at the edge"
    );
    metrics::describe_counter!(
        "gateway_cache_reads_total",
        "Cache lookups by cache name and hit/miss"
    );
    metrics::describe_counter!("gateway_cache_writes_total", "Stored cache entries by cache");
    metrics::describe_counter!(
        "gateway_quota_exceeded_total",
        "Cache writes rejected for capacity, by cache"
    );
    metrics::describe_counter!("gateway_fetches_total", "Upstream fetches by outcome");
}

pub fn record_dispatch(outcome: &'static str) {
    metrics::counter!("gateway_dispatch_total", "outcome" => outcome).increment(1);
}

pub fn record_request_duration(start: Instant) {
    metrics::histogram!("gateway_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_cache_read(cache_name: &str, hit: bool) {
    metrics::counter!(
        "gateway_cache_reads_total",
        "cache" => cache_name.to_string(),
        "result" => if hit { "hit" } else { "miss" }
    )
    .increment(1);
}

pub fn record_cache_write(cache_name: &str) {
    metrics::counter!("gateway_cache_writes_total", "cache" => cache_name.to_string())
        .increment(1);
}

pub fn record_quota_exceeded(cache_name: &str) {
    metrics::counter!("gateway_quota_exceeded_total", "cache" => cache_name.to_string())
        .increment(1);
}

pub fn record_fetch(success: bool) {
    metrics::counter!(
        "gateway_fetches_total",
        "outcome" => if success { "success" } else { "failure" }
    )
    .increment(1);
}
