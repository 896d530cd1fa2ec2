//! Typed access to room, game, and player records.

use std::sync::Arc;

use super::{
    errors::{EngineError, EngineResult},
    models::{FieldValue, Game, Player, Room, game_fields},
    phase::GamePhase,
};
use crate::store::{KeyBuilder, KeyScan, KeyValueStore, WriteBatch};

/// Field updates for one record, written together
pub type FieldUpdates<'a> = [(&'a str, String)];

/// Repository over the room/game/player field-sets
///
/// Every getter treats an absent key as `None` or empty. Every updater
/// writes all of its fields in a single store command.
#[derive(Clone)]
pub struct GameRepository {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
}

impl GameRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn keys(&self) -> &KeyBuilder {
        &self.keys
    }

    /// Read a room's game record
    ///
    /// # Returns
    ///
    /// * `EngineResult<Option<Game>>` - `None` when the room has no game record
    pub async fn get_game(&self, club_id: &str, room_id: &str) -> EngineResult<Option<Game>> {
        let fields = self
            .store
            .hget_all(&self.keys.game_state(club_id, room_id))
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Game::from_fields(&fields)))
    }

    /// Read a room's descriptive record along with its seat and spectator counts
    pub async fn get_room(&self, club_id: &str, room_id: &str) -> EngineResult<Option<Room>> {
        let fields = self
            .store
            .hget_all(&self.keys.room_info(club_id, room_id))
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        let mut room = Room::from_fields(&fields);
        if room.club_id.is_empty() {
            room.club_id = club_id.to_string();
        }
        if room.room_id.is_empty() {
            room.room_id = room_id.to_string();
        }
        room.current_players = self.get_players_count(club_id, room_id).await?;
        room.current_spectators = self.get_spectators_count(club_id, room_id).await?;
        Ok(Some(room))
    }

    /// Seated user ids in ascending order
    pub async fn get_player_ids(&self, club_id: &str, room_id: &str) -> EngineResult<Vec<String>> {
        let mut ids = self
            .store
            .smembers(&self.keys.room_players(club_id, room_id))
            .await?;
        ids.sort();
        Ok(ids)
    }

    pub async fn get_player(
        &self,
        club_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> EngineResult<Option<Player>> {
        let fields = self
            .store
            .hget_all(&self.keys.player_info(club_id, room_id, user_id))
            .await?;
        if fields.is_empty() {
            return Ok(None);
        }
        let mut player = Player::from_fields(&fields);
        if player.user_id.is_empty() {
            player.user_id = user_id.to_string();
        }
        Ok(Some(player))
    }

    /// Every seated player with a record, ordered by user id
    pub async fn get_players(&self, club_id: &str, room_id: &str) -> EngineResult<Vec<Player>> {
        let mut players = Vec::new();
        for user_id in self.get_player_ids(club_id, room_id).await? {
            if let Some(player) = self.get_player(club_id, room_id, &user_id).await? {
                players.push(player);
            }
        }
        Ok(players)
    }

    /// Seated players still contesting the pot
    pub async fn get_active_players(
        &self,
        club_id: &str,
        room_id: &str,
    ) -> EngineResult<Vec<Player>> {
        let players = self.get_players(club_id, room_id).await?;
        Ok(players.into_iter().filter(Player::is_in_hand).collect())
    }

    pub async fn get_players_count(&self, club_id: &str, room_id: &str) -> EngineResult<usize> {
        Ok(self
            .store
            .scard(&self.keys.room_players(club_id, room_id))
            .await?)
    }

    pub async fn get_spectators_count(&self, club_id: &str, room_id: &str) -> EngineResult<usize> {
        Ok(self
            .store
            .scard(&self.keys.room_spectators(club_id, room_id))
            .await?)
    }

    pub async fn room_exists(&self, club_id: &str, room_id: &str) -> EngineResult<bool> {
        Ok(self
            .store
            .exists(&self.keys.room_info(club_id, room_id))
            .await?)
    }

    pub async fn is_player_in_room(
        &self,
        club_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> EngineResult<bool> {
        Ok(self
            .store
            .sismember(&self.keys.room_players(club_id, room_id), user_id)
            .await?)
    }

    pub async fn is_spectator_in_room(
        &self,
        club_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> EngineResult<bool> {
        Ok(self
            .store
            .sismember(&self.keys.room_spectators(club_id, room_id), user_id)
            .await?)
    }

    /// True while a hand id is set and the phase is between the deal and the finish
    pub async fn is_game_active(&self, club_id: &str, room_id: &str) -> EngineResult<bool> {
        Ok(self.get_game(club_id, room_id).await?.is_some_and(|game| {
            game.has_active_hand() && game.phase.known().is_some_and(|p| p.is_hand_in_progress())
        }))
    }

    pub async fn update_game_fields(
        &self,
        club_id: &str,
        room_id: &str,
        fields: &FieldUpdates<'_>,
    ) -> EngineResult<()> {
        self.write_fields(&self.keys.game_state(club_id, room_id), fields)
            .await
    }

    pub async fn update_room_fields(
        &self,
        club_id: &str,
        room_id: &str,
        fields: &FieldUpdates<'_>,
    ) -> EngineResult<()> {
        self.write_fields(&self.keys.room_info(club_id, room_id), fields)
            .await
    }

    pub async fn update_player_fields(
        &self,
        club_id: &str,
        room_id: &str,
        user_id: &str,
        fields: &FieldUpdates<'_>,
    ) -> EngineResult<()> {
        self.write_fields(&self.keys.player_info(club_id, room_id, user_id), fields)
            .await
    }

    /// Room ids in a club's active index, in score order
    pub async fn active_room_ids(&self, club_id: &str) -> EngineResult<Vec<String>> {
        Ok(self
            .store
            .zrange(&self.keys.club_rooms_active(club_id), 0, -1)
            .await?)
    }

    /// Every club-scoped active-room index key currently in the store
    pub async fn scan_active_room_indexes(&self) -> EngineResult<Vec<String>> {
        let pattern = self.keys.club_rooms_active_pattern();
        Ok(KeyScan::new(self.store.as_ref(), pattern)
            .collect_all()
            .await?)
    }

    /// Move a hand to `to`, rejecting edges the phase graph does not allow
    ///
    /// Returns the phase the hand was in before the move.
    pub async fn advance_phase(
        &self,
        club_id: &str,
        room_id: &str,
        to: GamePhase,
    ) -> EngineResult<GamePhase> {
        let game = self
            .get_game(club_id, room_id)
            .await?
            .ok_or_else(|| EngineError::RoomNotFound {
                club_id: club_id.to_string(),
                room_id: room_id.to_string(),
            })?;

        let from = match game.phase {
            FieldValue::Known(phase) => phase,
            FieldValue::Missing => GamePhase::Waiting,
            FieldValue::Unrecognized(raw) => {
                return Err(EngineError::CorruptField {
                    field: game_fields::PHASE.to_string(),
                    reason: format!("unrecognized phase {raw:?}"),
                });
            }
        };
        if !from.can_transition_to(to) {
            return Err(EngineError::InvalidTransition { from, to });
        }

        self.update_game_fields(club_id, room_id, &[(game_fields::PHASE, to.to_string())])
            .await?;
        log::debug!("Room {}:{} phase {} -> {}", club_id, room_id, from, to);
        Ok(from)
    }

    /// Delete every key belonging to a room, including per-user records
    pub async fn cleanup_room(&self, club_id: &str, room_id: &str) -> EngineResult<()> {
        let players = self
            .store
            .smembers(&self.keys.room_players(club_id, room_id))
            .await?;
        let spectators = self
            .store
            .smembers(&self.keys.room_spectators(club_id, room_id))
            .await?;

        let mut batch = WriteBatch::new();
        for key in self.keys.room_keys(club_id, room_id) {
            batch = batch.del(key);
        }
        for user_id in &players {
            batch = batch.del(self.keys.player_info(club_id, room_id, user_id));
        }
        for user_id in &spectators {
            batch = batch.del(self.keys.spectator_info(club_id, room_id, user_id));
        }
        self.store.execute_batch(batch).await?;

        log::info!(
            "Cleaned up room {}:{} ({} players, {} spectators)",
            club_id,
            room_id,
            players.len(),
            spectators.len()
        );
        Ok(())
    }

    async fn write_fields(&self, key: &str, fields: &FieldUpdates<'_>) -> EngineResult<()> {
        let fields: Vec<(String, String)> = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        self.store.hset_multiple(key, &fields).await?;
        Ok(())
    }
}
