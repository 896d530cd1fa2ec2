//! Store configuration module.
//!
//! Provides configuration for connecting to the shared key/value store.

use std::env;

/// Store connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Redis connection URL (`redis://[:password@]host:port/db`)
    pub redis_url: String,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Number of connection attempts before giving up at startup
    pub reconnect_attempts: u32,

    /// Optional namespace prefixed to every key
    pub key_namespace: String,
}

impl StoreConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `REDIS_URL`: Redis connection string (default: `redis://127.0.0.1:6379/0`)
    /// - `REDIS_CONNECT_TIMEOUT_SECS`: Connection timeout in seconds (default: 5)
    /// - `REDIS_RECONNECT_ATTEMPTS`: Startup connection attempts (default: 3)
    /// - `REDIS_KEY_NAMESPACE`: Key prefix (default: empty)
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::development();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            connect_timeout_secs: env::var("REDIS_CONNECT_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.connect_timeout_secs),
            reconnect_attempts: env::var("REDIS_RECONNECT_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reconnect_attempts),
            key_namespace: env::var("REDIS_KEY_NAMESPACE").unwrap_or_default(),
        }
    }

    /// Default configuration for local development
    pub fn development() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            connect_timeout_secs: 5,
            reconnect_attempts: 3,
            key_namespace: String::new(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::development()
    }
}
