//! Append-only per-room action log.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::models::{ActionEvent, ActionType, DEFAULT_HISTORY_LIMIT};
use crate::{
    game::errors::EngineResult,
    store::{KeyBuilder, KeyValueStore},
};

/// Destination for room action events
///
/// `append` reports failures; the typed helpers are best-effort and only log
/// them, since a missing audit entry must never block a lifecycle transition.
#[async_trait]
pub trait ActionSink: Send + Sync {
    /// Append one event to a room's log
    async fn append(
        &self,
        club_id: &str,
        room_id: &str,
        action: &str,
        data: Option<serde_json::Value>,
    ) -> EngineResult<()>;

    /// Append, logging and discarding any failure
    async fn append_best_effort(
        &self,
        club_id: &str,
        room_id: &str,
        action: ActionType,
        data: serde_json::Value,
    ) {
        if let Err(e) = self.append(club_id, room_id, action.as_str(), Some(data)).await {
            log::warn!(
                "Failed to record {} for room {}:{}: {}",
                action,
                club_id,
                room_id,
                e
            );
        }
    }

    async fn game_started(&self, club_id: &str, room_id: &str, game_id: &str, players_count: usize) {
        self.append_best_effort(
            club_id,
            room_id,
            ActionType::GameStarted,
            json!({
                "game_id": game_id,
                "phase": "pre_flop",
                "players_count": players_count,
            }),
        )
        .await;
    }

    async fn game_stopped(&self, club_id: &str, room_id: &str, previous_phase: &str, reason: &str) {
        self.append_best_effort(
            club_id,
            room_id,
            ActionType::GameStopped,
            json!({ "previous_phase": previous_phase, "reason": reason }),
        )
        .await;
    }

    async fn phase_changed(&self, club_id: &str, room_id: &str, old_phase: &str, new_phase: &str) {
        self.append_best_effort(
            club_id,
            room_id,
            ActionType::PhaseChanged,
            json!({ "old_phase": old_phase, "new_phase": new_phase }),
        )
        .await;
    }

    async fn cards_dealt(&self, club_id: &str, room_id: &str, players_count: usize) {
        self.append_best_effort(
            club_id,
            room_id,
            ActionType::CardsDealt,
            json!({ "players_count": players_count }),
        )
        .await;
    }

    async fn community_cards_revealed(
        &self,
        club_id: &str,
        room_id: &str,
        phase: &str,
        cards_count: usize,
    ) {
        self.append_best_effort(
            club_id,
            room_id,
            ActionType::CommunityCardsRevealed,
            json!({ "phase": phase, "cards_count": cards_count }),
        )
        .await;
    }

    async fn error(&self, club_id: &str, room_id: &str, error_type: &str, message: &str) {
        self.append_best_effort(
            club_id,
            room_id,
            ActionType::Error,
            json!({ "error_type": error_type, "error_message": message }),
        )
        .await;
    }
}

/// Action log stored as a list of JSON events per room
#[derive(Clone)]
pub struct ActionLogger {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
}

impl ActionLogger {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    /// Most recent events, oldest first
    ///
    /// # Arguments
    ///
    /// * `count` - Number of events to return; 0 means the default of 100
    ///
    /// Entries that fail to parse are skipped.
    pub async fn read_recent(
        &self,
        club_id: &str,
        room_id: &str,
        count: usize,
    ) -> EngineResult<Vec<ActionEvent>> {
        let count = if count == 0 { DEFAULT_HISTORY_LIMIT } else { count };
        let start = -(count.min(isize::MAX as usize) as isize);
        let raw = self
            .store
            .lrange(&self.keys.room_actions(club_id, room_id), start, -1)
            .await?;

        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<ActionEvent>(entry) {
                Ok(event) => Some(event),
                Err(e) => {
                    log::warn!(
                        "Skipping malformed action in room {}:{}: {}",
                        club_id,
                        room_id,
                        e
                    );
                    None
                }
            })
            .collect())
    }

    /// Number of stored events
    pub async fn count(&self, club_id: &str, room_id: &str) -> EngineResult<usize> {
        Ok(self
            .store
            .llen(&self.keys.room_actions(club_id, room_id))
            .await?)
    }

    pub async fn clear(&self, club_id: &str, room_id: &str) -> EngineResult<()> {
        self.store
            .del(&[self.keys.room_actions(club_id, room_id)])
            .await?;
        log::info!("Cleared action history for room {}:{}", club_id, room_id);
        Ok(())
    }

    /// Keep only the newest `keep_last` events; 0 clears the log
    pub async fn trim(&self, club_id: &str, room_id: &str, keep_last: usize) -> EngineResult<()> {
        if keep_last == 0 {
            return self.clear(club_id, room_id).await;
        }
        let start = -(keep_last.min(isize::MAX as usize) as isize);
        self.store
            .ltrim(&self.keys.room_actions(club_id, room_id), start, -1)
            .await?;
        log::debug!(
            "Trimmed action history for room {}:{} to {} entries",
            club_id,
            room_id,
            keep_last
        );
        Ok(())
    }

    /// Recent events of one type, searched within the newest `limit` entries
    pub async fn by_type(
        &self,
        club_id: &str,
        room_id: &str,
        action: &str,
        limit: usize,
    ) -> EngineResult<Vec<ActionEvent>> {
        let events = self.read_recent(club_id, room_id, limit).await?;
        Ok(events.into_iter().filter(|e| e.action == action).collect())
    }

    /// Recent events whose payload names `user_id`
    pub async fn by_user(
        &self,
        club_id: &str,
        room_id: &str,
        user_id: &str,
        limit: usize,
    ) -> EngineResult<Vec<ActionEvent>> {
        let events = self.read_recent(club_id, room_id, limit).await?;
        Ok(events
            .into_iter()
            .filter(|e| e.user_id() == Some(user_id))
            .collect())
    }
}

#[async_trait]
impl ActionSink for ActionLogger {
    async fn append(
        &self,
        club_id: &str,
        room_id: &str,
        action: &str,
        data: Option<serde_json::Value>,
    ) -> EngineResult<()> {
        let event = ActionEvent::new(action, data);
        let encoded = serde_json::to_string(&event)?;
        self.store
            .rpush(&self.keys.room_actions(club_id, room_id), &[encoded])
            .await?;
        log::debug!("Room {}:{} action {}", club_id, room_id, action);
        Ok(())
    }
}
