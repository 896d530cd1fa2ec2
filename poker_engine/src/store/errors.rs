//! Store error types.

use thiserror::Error;

/// Key/value store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store could not be reached or rejected the command
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Redis client error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Key holds a value of a different type than the command expects
    #[error("Wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    /// Connection could not be established within the configured attempts
    #[error("Failed to connect after {attempts} attempt(s): {reason}")]
    ConnectFailed { attempts: u32, reason: String },
}

impl StoreError {
    /// Whether the error is transient and the operation may succeed on retry
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::ConnectFailed { .. } => true,
            StoreError::Redis(e) => {
                e.is_io_error() || e.is_connection_dropped() || e.is_timeout()
            }
            StoreError::WrongType { .. } => false,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
