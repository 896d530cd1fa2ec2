//! Structured logging configuration.
//!
//! Installs a `tracing` subscriber for the daemon. The engine library logs
//! through the `log` facade; those records are forwarded into the same
//! subscriber, so one `RUST_LOG` filter controls both.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info,redis=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var, for example
/// `RUST_LOG=poker_engine=debug,info`.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a room lifecycle summary with structured fields
pub fn log_shutdown_summary(ticks: u64, started: u64, stopped: u64, failures: u64) {
    tracing::info!(
        ticks = ticks,
        games_started = started,
        games_stopped = stopped,
        failures = failures,
        "Room monitor summary"
    );
}
