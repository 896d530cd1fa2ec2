//! Lifecycle controller configuration.

use std::{env, time::Duration};
use thiserror::Error;

/// Largest table the engine will manage (52 cards, 2 per seat, 5 board, 3 burns)
pub const MAX_SEATS: usize = 22;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineConfigError {
    #[error("Check interval must be greater than zero")]
    ZeroInterval,

    #[error("Minimum players to start must be at least 2, got {0}")]
    MinPlayersTooLow(usize),

    #[error("Maximum players per room ({max}) is below the minimum to start ({min})")]
    MaxBelowMin { min: usize, max: usize },

    #[error("Maximum players per room must be at most 22, got {0}")]
    MaxPlayersTooHigh(usize),
}

/// Room monitor and lifecycle settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Time between room scans
    pub check_interval: Duration,

    /// How long shutdown waits for the in-flight tick
    pub shutdown_timeout: Duration,

    /// Seated players needed to start a hand
    pub min_players_to_start: usize,

    /// Seat capacity assumed for rooms
    pub max_players_per_room: usize,

    /// Deal hole cards as part of starting a hand
    pub deal_on_start: bool,
}

impl EngineConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `ENGINE_CHECK_INTERVAL`: Scan interval (default: `2s`)
    /// - `ENGINE_SHUTDOWN_TIMEOUT`: Graceful shutdown budget (default: `10s`)
    /// - `ENGINE_MIN_PLAYERS`: Players needed to start (default: 2)
    /// - `ENGINE_MAX_PLAYERS`: Seats per room (default: 9)
    /// - `ENGINE_DEAL_ON_START`: Deal hole cards on start (default: true)
    ///
    /// Durations accept `500ms`, `2s`, `1m`, or bare seconds. Unparseable
    /// values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            check_interval: env_duration("ENGINE_CHECK_INTERVAL", defaults.check_interval),
            shutdown_timeout: env_duration("ENGINE_SHUTDOWN_TIMEOUT", defaults.shutdown_timeout),
            min_players_to_start: env_parse("ENGINE_MIN_PLAYERS", defaults.min_players_to_start),
            max_players_per_room: env_parse("ENGINE_MAX_PLAYERS", defaults.max_players_per_room),
            deal_on_start: env::var("ENGINE_DEAL_ON_START")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.deal_on_start),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.check_interval.is_zero() {
            return Err(EngineConfigError::ZeroInterval);
        }
        if self.min_players_to_start < 2 {
            return Err(EngineConfigError::MinPlayersTooLow(self.min_players_to_start));
        }
        if self.max_players_per_room < self.min_players_to_start {
            return Err(EngineConfigError::MaxBelowMin {
                min: self.min_players_to_start,
                max: self.max_players_per_room,
            });
        }
        if self.max_players_per_room > MAX_SEATS {
            return Err(EngineConfigError::MaxPlayersTooHigh(self.max_players_per_room));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(2),
            shutdown_timeout: Duration::from_secs(10),
            min_players_to_start: 2,
            max_players_per_room: 9,
            deal_on_start: true,
        }
    }
}

/// Parse `500ms`, `2s`, `1m`, `1h`, or a bare number of seconds
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (number, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => value.split_at(idx),
        None => (value, "s"),
    };
    let amount: u64 = number.parse().ok()?;
    match unit {
        "ms" => Some(Duration::from_millis(amount)),
        "s" => Some(Duration::from_secs(amount)),
        "m" => Some(Duration::from_secs(amount.checked_mul(60)?)),
        "h" => Some(Duration::from_secs(amount.checked_mul(3600)?)),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_duration(var: &str, default: Duration) -> Duration {
    match env::var(var) {
        Ok(raw) => parse_duration(&raw).unwrap_or_else(|| {
            log::warn!("Ignoring invalid {}={:?}, using {:?}", var, raw, default);
            default
        }),
        Err(_) => default,
    }
}

fn env_parse(var: &str, default: usize) -> usize {
    match env::var(var) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}, using {}", var, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.check_interval, Duration::from_secs(2));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
        assert_eq!(config.min_players_to_start, 2);
        assert_eq!(config.max_players_per_room, 9);
        assert!(config.deal_on_start);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2s"), Some(Duration::from_secs(2)));
        assert_eq!(parse_duration("1m"), Some(Duration::from_secs(60)));
        assert_eq!(parse_duration("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("fast"), None);
        assert_eq!(parse_duration("2d"), None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig {
            check_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(EngineConfigError::ZeroInterval));

        config.check_interval = Duration::from_secs(1);
        config.min_players_to_start = 1;
        assert_eq!(config.validate(), Err(EngineConfigError::MinPlayersTooLow(1)));

        config.min_players_to_start = 6;
        config.max_players_per_room = 4;
        assert!(matches!(config.validate(), Err(EngineConfigError::MaxBelowMin { .. })));

        config.max_players_per_room = 30;
        assert_eq!(config.validate(), Err(EngineConfigError::MaxPlayersTooHigh(30)));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
