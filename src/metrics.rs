// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for ovh-webhook
//!
//! This module provides metrics for monitoring the webhook:
//! - HTTP request metrics (count, duration, status codes)
//! - Challenge operation metrics (present, cleanup)
//! - OVH API call metrics

use lazy_static::lazy_static;
use prometheus::{
    opts, register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec,
    TextEncoder,
};

lazy_static! {
    /// HTTP request counter by method, path, and status code
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "ovh_webhook_http_requests_total",
            "Total number of HTTP requests processed"
        ),
        &["method", "path", "status"]
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric");

    /// HTTP request duration histogram
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ovh_webhook_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric");

    /// Challenge operations counter by action and result
    pub static ref CHALLENGE_OPERATIONS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "ovh_webhook_challenge_operations_total",
            "Total number of DNS-01 challenge operations"
        ),
        &["action", "result"]
    )
    .expect("Failed to create CHALLENGE_OPERATIONS_TOTAL metric");

    /// OVH API call counter by HTTP method and result
    pub static ref OVH_API_CALLS_TOTAL: CounterVec = register_counter_vec!(
        opts!(
            "ovh_webhook_ovh_api_calls_total",
            "Total number of OVH API calls"
        ),
        &["method", "result"]
    )
    .expect("Failed to create OVH_API_CALLS_TOTAL metric");

    /// OVH API call duration histogram
    pub static ref OVH_API_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "ovh_webhook_ovh_api_call_duration_seconds",
        "OVH API call duration in seconds",
        &["method"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to create OVH_API_CALL_DURATION_SECONDS metric");

    /// Application info metric
    pub static ref APP_INFO: CounterVec = register_counter_vec!(
        opts!(
            "ovh_webhook_app_info",
            "Application information"
        ),
        &["version"]
    )
    .expect("Failed to create APP_INFO metric");
}

/// Initialize metrics with application info
pub fn init_metrics() {
    APP_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .inc();
}

/// Generate metrics output in Prometheus format
pub fn gather_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration);
}

/// Record a challenge operation
pub fn record_challenge_operation(action: &str, success: bool) {
    let result = if success { "success" } else { "error" };
    CHALLENGE_OPERATIONS_TOTAL
        .with_label_values(&[action, result])
        .inc();
}

/// Record an OVH API call
pub fn record_ovh_api_call(method: &str, success: bool, duration: f64) {
    let result = if success { "success" } else { "error" };
    OVH_API_CALLS_TOTAL
        .with_label_values(&[method, result])
        .inc();
    OVH_API_CALL_DURATION_SECONDS
        .with_label_values(&[method])
        .observe(duration);
}
