//! Engine error types.

use thiserror::Error;

use super::phase::GamePhase;
use crate::store::StoreError;

/// Errors returned by the repository, dealer, and lifecycle controller
#[derive(Debug, Error)]
pub enum EngineError {
    /// Underlying store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Dealing requested for a room with nobody seated
    #[error("No players seated in room {club_id}:{room_id}")]
    NoPlayers { club_id: String, room_id: String },

    /// Deck ran out before the requested cards were drawn
    #[error("Deck exhausted: needed {needed}, drew {drawn}")]
    DeckExhausted { needed: usize, drawn: usize },

    /// Operation requires a hand in progress
    #[error("No active hand in room {club_id}:{room_id}")]
    NoActiveHand { club_id: String, room_id: String },

    /// Phase change not permitted by the phase graph
    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition { from: GamePhase, to: GamePhase },

    /// Community card deal would leave a count other than 0, 3, 4, or 5
    #[error("Invalid community card deal: {current} on board, {requested} requested")]
    InvalidCommunityCount { current: usize, requested: usize },

    /// Room has no game record
    #[error("Room not found: {club_id}:{room_id}")]
    RoomNotFound { club_id: String, room_id: String },

    /// Monitor loop is not running
    #[error("Room monitor is not running")]
    MonitorNotRunning,

    /// Stored value could not be decoded
    #[error("Corrupt field {field}: {reason}")]
    CorruptField { field: String, reason: String },

    /// JSON encoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the next monitor tick may succeed where this attempt failed
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
