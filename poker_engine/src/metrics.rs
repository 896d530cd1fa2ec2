//! Engine metrics recorded through the `metrics` facade.
//!
//! The library only records; installing an exporter is up to the binary.
//! Without a recorder installed every call is a no-op.
//!
//! # Metrics
//!
//! - **Monitor**: ticks, tick duration, rooms checked
//! - **Lifecycle**: games started, games stopped by reason, transition failures by kind
//! - **Dealing**: cards dealt

use std::time::Duration;

// ============================================================================
// Monitor Metrics
// ============================================================================

/// Record one completed monitor tick and its duration.
pub fn monitor_tick(duration: Duration) {
    metrics::counter!("monitor_ticks_total").increment(1);
    metrics::histogram!("monitor_tick_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Record rooms evaluated during a tick.
pub fn rooms_checked(count: usize) {
    metrics::counter!("rooms_checked_total").increment(count as u64);
}

// ============================================================================
// Lifecycle Metrics
// ============================================================================

/// Increment games started counter.
pub fn game_started() {
    metrics::counter!("games_started_total").increment(1);
}

/// Increment games stopped counter with reason label.
pub fn game_stopped(reason: &str) {
    metrics::counter!("games_stopped_total", "reason" => reason.to_string()).increment(1);
}

/// Record a failed start/stop/evaluation.
///
/// `kind` is one of `start`, `stop`, `evaluate`, `deal`.
pub fn transition_failure(kind: &'static str) {
    metrics::counter!("transition_failures_total", "kind" => kind).increment(1);
}

// ============================================================================
// Dealing Metrics
// ============================================================================

/// Increment cards dealt counter.
pub fn cards_dealt(count: usize) {
    metrics::counter!("cards_dealt_total").increment(count as u64);
}
