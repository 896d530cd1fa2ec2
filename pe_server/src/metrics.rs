//! Prometheus metrics export for the room lifecycle daemon.
//!
//! The engine records through the `metrics` facade; this module installs the
//! Prometheus recorder and scrape endpoint, describes the engine's metrics,
//! and tracks daemon-level gauges.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! let addr: std::net::SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//! metrics::monitor_running(true);
//! ```

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))?;
    describe_metrics();
    Ok(())
}

/// Register help text for every metric the engine records
fn describe_metrics() {
    describe_counter!("monitor_ticks_total", "Completed room scans");
    describe_histogram!(
        "monitor_tick_duration_ms",
        Unit::Milliseconds,
        "Duration of one room scan"
    );
    describe_counter!("rooms_checked_total", "Rooms evaluated across all scans");
    describe_counter!("games_started_total", "Hands started by the monitor");
    describe_counter!("games_stopped_total", "Hands stopped, labelled by reason");
    describe_counter!(
        "transition_failures_total",
        "Failed start, stop, evaluate, or deal attempts"
    );
    describe_counter!("cards_dealt_total", "Cards dealt to players and boards");
    describe_gauge!("room_monitor_running", "1 while the room monitor loop runs");
}

// ============================================================================
// Daemon Metrics
// ============================================================================

/// Set the monitor running gauge.
pub fn monitor_running(running: bool) {
    metrics::gauge!("room_monitor_running").set(if running { 1.0 } else { 0.0 });
}
