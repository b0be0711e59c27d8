//! Controller metrics for latency tracking and monitoring.
//!
//! This module provides:
//! - Per-controller response counters labelled by status key
//! - Per-controller failure counters labelled by error kind
//! - Per-controller latency histogram

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Controller latency metric name.
pub const METRIC_CONTROLLER_LATENCY: &str = "controller_latency_ms";
/// Responses written by controllers.
pub const METRIC_CONTROLLER_REQUESTS: &str = "controller_requests_total";
/// Failures delegated to the error handler.
pub const METRIC_CONTROLLER_FAILURES: &str = "controller_failures_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_histogram!(
        METRIC_CONTROLLER_LATENCY,
        "Time from terminal stage entry to response in milliseconds"
    );
    describe_counter!(
        METRIC_CONTROLLER_REQUESTS,
        "Total number of service responses written by controllers"
    );
    describe_counter!(
        METRIC_CONTROLLER_FAILURES,
        "Total number of controller failures delegated to the error handler"
    );

    debug!("Metrics initialized");
}

/// Increment the response counter for a controller and status key.
pub fn inc_controller_requests(controller: &str, status: &'static str) {
    counter!(
        METRIC_CONTROLLER_REQUESTS,
        "controller" => controller.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Increment the failure counter for a controller and error kind.
pub fn inc_controller_failures(controller: &str, kind: &'static str) {
    counter!(
        METRIC_CONTROLLER_FAILURES,
        "controller" => controller.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// RAII guard for timing a controller.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    controller: String,
}

impl LatencyTimer {
    /// Create a new latency timer for the given controller.
    pub fn new(controller: &str) -> Self {
        Self {
            start: Instant::now(),
            controller: controller.to_string(),
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.elapsed_ms();
        histogram!(METRIC_CONTROLLER_LATENCY, "controller" => self.controller.clone())
            .record(latency_ms);
    }
}
