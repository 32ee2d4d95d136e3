//! Lightweight metrics helpers for NutriGate.
//!
//! Thin wrappers over the `metrics` crate macros. No exporter is installed here;
//! the embedding application may register any compatible recorder.
//!
//! Provided metrics:
//! * `nutrigate_requests_total` (counter; route, method, status)
//! * `nutrigate_request_duration_seconds` (histogram; route, method)
//! * `nutrigate_upstream_requests_total` (counter; upstream, status)
//! * `nutrigate_upstream_request_duration_seconds` (histogram; upstream)
//! * `nutrigate_rate_limited_total` (counter; upstream)
//!
//! The `*Timer` structs record durations on `Drop`, so early returns are covered.
use std::time::Instant;

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::Lazy;

pub const NUTRIGATE_REQUESTS_TOTAL: &str = "nutrigate_requests_total";
pub const NUTRIGATE_REQUEST_DURATION_SECONDS: &str = "nutrigate_request_duration_seconds";
pub const NUTRIGATE_UPSTREAM_REQUESTS_TOTAL: &str = "nutrigate_upstream_requests_total";
pub const NUTRIGATE_UPSTREAM_REQUEST_DURATION_SECONDS: &str =
    "nutrigate_upstream_request_duration_seconds";
pub const NUTRIGATE_RATE_LIMITED_TOTAL: &str = "nutrigate_rate_limited_total";

static DESCRIPTIONS: Lazy<()> = Lazy::new(|| {
    describe_counter!(
        NUTRIGATE_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of HTTP requests answered by the proxy."
    );
    describe_histogram!(
        NUTRIGATE_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of HTTP requests answered by the proxy."
    );
    describe_counter!(
        NUTRIGATE_UPSTREAM_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests sent to upstream food-data APIs (status 0 = transport failure)."
    );
    describe_histogram!(
        NUTRIGATE_UPSTREAM_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Latency of requests sent to upstream food-data APIs."
    );
    describe_counter!(
        NUTRIGATE_RATE_LIMITED_TOTAL,
        Unit::Count,
        "Requests rejected by the rate gate."
    );
});

/// Classify a path into a bounded label so metrics cardinality stays small.
pub fn route_label(path: &str) -> &'static str {
    if path.starts_with("/usda/") {
        "usda"
    } else if path.starts_with("/off/search") {
        "off_search"
    } else if path.starts_with("/off/product") {
        "off_product"
    } else if path.starts_with("/off/") {
        "off"
    } else if path == "/" {
        "root"
    } else {
        "other"
    }
}

pub fn increment_request_total(route: &str, method: &str, status: u16) {
    counter!(
        NUTRIGATE_REQUESTS_TOTAL,
        "route" => route.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_request_duration(route: &str, method: &str, duration: std::time::Duration) {
    histogram!(
        NUTRIGATE_REQUEST_DURATION_SECONDS,
        "route" => route.to_string(),
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn increment_upstream_request_total(upstream: &str, status: u16) {
    counter!(
        NUTRIGATE_UPSTREAM_REQUESTS_TOTAL,
        "upstream" => upstream.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_upstream_request_duration(upstream: &str, duration: std::time::Duration) {
    histogram!(
        NUTRIGATE_UPSTREAM_REQUEST_DURATION_SECONDS,
        "upstream" => upstream.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn increment_rate_limited_total(upstream: &str) {
    counter!(NUTRIGATE_RATE_LIMITED_TOTAL, "upstream" => upstream.to_string()).increment(1);
}

/// RAII helper measuring inbound request duration.
pub struct RequestTimer {
    start: Instant,
    route: &'static str,
    method: String,
}

impl RequestTimer {
    pub fn new(route: &'static str, method: &str) -> Self {
        Self {
            start: Instant::now(),
            route,
            method: method.to_string(),
        }
    }
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        record_request_duration(self.route, &self.method, self.start.elapsed());
    }
}

/// RAII helper measuring upstream request duration.
pub struct UpstreamRequestTimer {
    start: Instant,
    upstream: &'static str,
}

impl UpstreamRequestTimer {
    pub fn new(upstream: &'static str) -> Self {
        Self {
            start: Instant::now(),
            upstream,
        }
    }
}

impl Drop for UpstreamRequestTimer {
    fn drop(&mut self) {
        record_upstream_request_duration(self.upstream, self.start.elapsed());
    }
}

/// Register metric descriptions (idempotent).
pub fn init_metrics() -> eyre::Result<()> {
    tracing::info!("Initializing NutriGate metrics descriptions");
    Lazy::force(&DESCRIPTIONS);
    Ok(())
}
