//! Action log event types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source tag stamped on every event written by the engine
pub const ENGINE_SOURCE: &str = "game_engine";

/// Default number of events returned by history reads
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Kind of event appended to a room's action log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    GameStarted,
    GameStopped,
    PhaseChanged,
    CardsDealt,
    CommunityCardsRevealed,
    Error,
}

impl ActionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionType::GameStarted => "game_started",
            ActionType::GameStopped => "game_stopped",
            ActionType::PhaseChanged => "phase_changed",
            ActionType::CardsDealt => "cards_dealt",
            ActionType::CommunityCardsRevealed => "community_cards_revealed",
            ActionType::Error => "error",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a room's action log, stored as a JSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEvent {
    pub action: String,
    /// Unix seconds
    pub timestamp: i64,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ActionEvent {
    /// Build an engine-sourced event stamped with the current time
    pub fn new(action: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        Self {
            action: action.into(),
            timestamp: Utc::now().timestamp(),
            source: ENGINE_SOURCE.to_string(),
            data,
        }
    }

    /// `data.user_id`, when the payload carries one
    pub fn user_id(&self) -> Option<&str> {
        self.data.as_ref()?.get("user_id")?.as_str()
    }
}
