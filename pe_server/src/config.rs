//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use poker_engine::{
    monitor::{EngineConfig, EngineConfigError, parse_duration},
    store::StoreConfig,
};
use std::{net::SocketAddr, time::Duration};

/// Complete daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared store connection
    pub store: StoreConfig,
    /// Room monitor and lifecycle settings
    pub engine: EngineConfig,
    /// Prometheus exporter address; no exporter when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Command-line overrides, applied on top of the environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub redis_url: Option<String>,
    pub min_players: Option<usize>,
    pub check_interval: Option<Duration>,
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values given on the command line, which win over the environment
    ///
    /// # Returns
    ///
    /// * `Result<ServerConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if `METRICS_BIND` is set but is not a socket address
    pub fn from_env(overrides: Overrides) -> Result<Self, ConfigError> {
        let mut store = StoreConfig::from_env();
        if let Some(url) = overrides.redis_url {
            store.redis_url = url;
        }

        let mut engine = EngineConfig::from_env();
        if let Some(min_players) = overrides.min_players {
            engine.min_players_to_start = min_players;
        }
        if let Some(interval) = overrides.check_interval {
            engine.check_interval = interval;
        }

        let metrics_bind = match overrides.metrics_bind {
            Some(addr) => Some(addr),
            None => match std::env::var("METRICS_BIND") {
                Ok(raw) if !raw.trim().is_empty() => {
                    Some(raw.trim().parse().map_err(|_| ConfigError::Invalid {
                        var: "METRICS_BIND".to_string(),
                        reason: format!("{raw:?} is not an IP:PORT address"),
                    })?)
                }
                _ => None,
            },
        };

        Ok(ServerConfig {
            store,
            engine,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.redis_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "REDIS_URL".to_string(),
                hint: "Set REDIS_URL=redis://host:6379/0 or pass --redis-url".to_string(),
            });
        }

        if !self.store.redis_url.starts_with("redis://")
            && !self.store.redis_url.starts_with("rediss://")
        {
            return Err(ConfigError::Invalid {
                var: "REDIS_URL".to_string(),
                reason: "Must start with redis:// or rediss://".to_string(),
            });
        }

        if self.engine.shutdown_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "ENGINE_SHUTDOWN_TIMEOUT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        self.engine.validate()?;
        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },

    #[error("Invalid engine configuration: {0}")]
    Engine(#[from] EngineConfigError),
}

/// Parse a `--interval` argument (`500ms`, `2s`, `1m`, or bare seconds)
pub fn parse_interval_arg(value: &str) -> Result<Duration, String> {
    parse_duration(value).ok_or_else(|| format!("invalid duration: {value}"))
}
