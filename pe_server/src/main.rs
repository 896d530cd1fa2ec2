//! Room lifecycle daemon.
//!
//! Connects to the shared store, runs the room monitor until interrupted,
//! and shuts the monitor down within the configured timeout.

mod config;
mod logging;
mod metrics;

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Error};
use pico_args::Arguments;
use poker_engine::{
    Engine,
    store::{KeyBuilder, RedisStore},
};

use config::{Overrides, ServerConfig, parse_interval_arg};

const HELP: &str = "\
Run the poker room lifecycle monitor

USAGE:
  pe_server [OPTIONS]

OPTIONS:
  --redis-url     URL        Redis connection string     [default: env REDIS_URL or redis://127.0.0.1:6379/0]
  --min-players   N          Players needed to start     [default: env ENGINE_MIN_PLAYERS or 2]
  --interval      DURATION   Scan interval (500ms, 2s)   [default: env ENGINE_CHECK_INTERVAL or 2s]
  --metrics-bind  IP:PORT    Prometheus scrape address   [default: env METRICS_BIND, disabled if unset]

FLAGS:
  -h, --help                 Print help information

ENVIRONMENT:
  REDIS_URL                  Redis connection string
  REDIS_KEY_NAMESPACE        Prefix for every key
  ENGINE_SHUTDOWN_TIMEOUT    Graceful shutdown budget (default 10s)
  ENGINE_DEAL_ON_START       Deal hole cards when a hand starts (default true)
  RUST_LOG                   Log filter (default info,redis=warn)
  (See .env file for all configuration options)
";

fn parse_args() -> Result<Overrides, Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        redis_url: pargs.opt_value_from_str("--redis-url")?,
        min_players: pargs.opt_value_from_str("--min-players")?,
        check_interval: pargs.opt_value_from_fn("--interval", parse_interval_arg)?,
        metrics_bind: pargs.opt_value_from_str::<_, SocketAddr>("--metrics-bind")?,
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        anyhow::bail!("Unexpected arguments: {:?}", remaining);
    }
    Ok(overrides)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let overrides = parse_args()?;
    logging::init();

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        tracing::info!("Prometheus metrics available at http://{}/metrics", addr);
    }

    tracing::info!("Connecting to Redis at {}", config.store.redis_url);
    let store = RedisStore::connect(&config.store)
        .await
        .context("Failed to connect to Redis")?;

    let keys = KeyBuilder::with_namespace(config.store.key_namespace.clone());
    let shutdown_timeout = config.engine.shutdown_timeout;
    let engine = Engine::new(Arc::new(store), keys, config.engine);

    engine.monitor.start().await;
    metrics::monitor_running(true);
    tracing::info!("Room monitor running. Press Ctrl+C to stop.");

    shutdown_signal().await;
    tracing::info!("Shutting down room monitor...");

    if tokio::time::timeout(shutdown_timeout, engine.monitor.stop())
        .await
        .is_err()
    {
        tracing::warn!(
            "Room monitor did not stop within {:?}, exiting anyway",
            shutdown_timeout
        );
    }
    metrics::monitor_running(false);

    let stats = engine.monitor.statistics();
    logging::log_shutdown_summary(
        stats.ticks,
        stats.games_started,
        stats.games_stopped,
        stats.failures,
    );
    Ok(())
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
