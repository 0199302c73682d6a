//! Metrics collection and export for the hub.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const EVENTS_TOTAL: &str = "royale_hub_events_total";
    pub const EVENTS_REJECTED: &str = "royale_hub_events_rejected_total";
    pub const NOTIFICATIONS_TOTAL: &str = "royale_hub_notifications_total";
    pub const DELIVERIES_TOTAL: &str = "royale_hub_deliveries_total";
    pub const SUBSCRIBERS_ACTIVE: &str = "royale_hub_subscribers_active";
    pub const SUBSCRIBERS_DROPPED: &str = "royale_hub_subscribers_dropped_total";
    pub const DISPATCH_SECONDS: &str = "royale_hub_dispatch_seconds";
    pub const ERRORS_TOTAL: &str = "royale_hub_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(names::EVENTS_TOTAL, "Inbound events accepted, by kind");
    metrics::describe_counter!(
        names::EVENTS_REJECTED,
        "Inbound events rejected at the boundary"
    );
    metrics::describe_counter!(
        names::NOTIFICATIONS_TOTAL,
        "Notifications published, by category"
    );
    metrics::describe_counter!(
        names::DELIVERIES_TOTAL,
        "Notifications queued for a subscriber"
    );
    metrics::describe_gauge!(
        names::SUBSCRIBERS_ACTIVE,
        "Current number of overlay subscribers"
    );
    metrics::describe_counter!(
        names::SUBSCRIBERS_DROPPED,
        "Subscribers removed after a failed delivery"
    );
    metrics::describe_histogram!(
        names::DISPATCH_SECONDS,
        "Time spent dispatching and publishing one event"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record an accepted inbound event.
pub fn record_event(kind: &'static str) {
    counter!(names::EVENTS_TOTAL, "kind" => kind).increment(1);
}

/// Record a rejected inbound event.
pub fn record_rejected() {
    counter!(names::EVENTS_REJECTED).increment(1);
}

/// Record a published notification.
pub fn record_notification(category: &'static str) {
    counter!(names::NOTIFICATIONS_TOTAL, "category" => category).increment(1);
}

/// Record the fan-out outcome of a publish.
pub fn record_fanout(delivered: usize, dropped: usize) {
    counter!(names::DELIVERIES_TOTAL).increment(delivered as u64);
    if dropped > 0 {
        counter!(names::SUBSCRIBERS_DROPPED).increment(dropped as u64);
    }
}

/// Record dispatch latency.
pub fn record_dispatch(seconds: f64) {
    histogram!(names::DISPATCH_SECONDS).record(seconds);
}

/// Update the active subscriber count.
pub fn set_active_subscribers(count: usize) {
    gauge!(names::SUBSCRIBERS_ACTIVE).set(count as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}
