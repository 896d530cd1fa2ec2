//! Start and stop transitions for a room's hand.
//!
//! Both transitions are a read, a decision, and one atomic batch. The read
//! and the write are not isolated from other writers, so each transition
//! re-checks the phase first and is safe to repeat: the next monitor tick
//! reconciles anything that changed in between.

use chrono::Utc;
use std::sync::Arc;

use crate::{
    actions::ActionSink,
    deck::CardDealer,
    game::{
        errors::{EngineError, EngineResult},
        models::{
            FieldValue, PlayerStatus, RoomStatus, format_flag, format_timestamp, game_fields,
            player_fields, pot_fields, room_fields,
        },
        phase::GamePhase,
        repository::GameRepository,
    },
    metrics,
    store::WriteBatch,
};

/// Stop reason used when the seated count falls below the start threshold
pub const REASON_INSUFFICIENT_PLAYERS: &str = "insufficient_players";

/// Stop reason used when dealing fails right after a start
pub const REASON_DEAL_FAILED: &str = "deal_failed";

/// Prefix applied to operator-forced stop reasons
pub const FORCE_STOP_PREFIX: &str = "force_stop: ";

/// Result of a start attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new hand was started
    Started { game_id: String },
    /// The room was no longer waiting; nothing was written
    AlreadyInProgress,
}

/// Result of a stop attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The hand was stopped
    Stopped { previous_phase: String },
    /// The room had no hand in progress; nothing was written
    AlreadyWaiting,
}

/// Drives a room between waiting and an active hand
#[derive(Clone)]
pub struct LifecycleController {
    repo: GameRepository,
    dealer: CardDealer,
    actions: Arc<dyn ActionSink>,
    deal_on_start: bool,
}

impl LifecycleController {
    pub fn new(
        repo: GameRepository,
        dealer: CardDealer,
        actions: Arc<dyn ActionSink>,
        deal_on_start: bool,
    ) -> Self {
        Self {
            repo,
            dealer,
            actions,
            deal_on_start,
        }
    }

    pub fn repository(&self) -> &GameRepository {
        &self.repo
    }

    /// Start a hand if the room is still waiting
    ///
    /// Writes room status, phase, game id, start time, pot and current bet
    /// in one atomic batch. When that batch fails nothing is assumed
    /// written and the caller may simply retry. With dealing enabled, a
    /// dealing failure immediately stops the hand again with reason
    /// `deal_failed` and the dealing error is returned, even when that stop
    /// fails too.
    ///
    /// # Arguments
    ///
    /// * `club_id` - Club the room belongs to
    /// * `room_id` - Room to start
    /// * `players_count` - Seated count observed by the caller, recorded in the action log
    pub async fn start_game(
        &self,
        club_id: &str,
        room_id: &str,
        players_count: usize,
    ) -> EngineResult<StartOutcome> {
        let game = self
            .repo
            .get_game(club_id, room_id)
            .await?
            .ok_or_else(|| room_not_found(club_id, room_id))?;
        if !game.is_waiting() {
            log::debug!(
                "Room {}:{} is no longer waiting ({}), skipping start",
                club_id,
                room_id,
                game.phase
            );
            return Ok(StartOutcome::AlreadyInProgress);
        }

        let now = Utc::now();
        let game_id = format!("game_{}_{}_{}", club_id, room_id, now.timestamp());
        let keys = self.repo.keys();
        let batch = WriteBatch::new()
            .hset(
                keys.room_info(club_id, room_id),
                [(room_fields::STATUS, RoomStatus::Gaming.as_str().to_string())],
            )
            .hset(
                keys.game_state(club_id, room_id),
                [
                    (game_fields::PHASE, GamePhase::PreFlop.as_str().to_string()),
                    (game_fields::GAME_ID, game_id.clone()),
                    (game_fields::STARTED_AT, format_timestamp(now)),
                    (game_fields::POT, "0".to_string()),
                    (game_fields::CURRENT_BET, "0".to_string()),
                ],
            );
        self.repo.store().execute_batch(batch).await?;

        metrics::game_started();
        self.actions
            .game_started(club_id, room_id, &game_id, players_count)
            .await;
        log::info!(
            "Game {} started in room {}:{} with {} players",
            game_id,
            club_id,
            room_id,
            players_count
        );

        if self.deal_on_start {
            if let Err(e) = self.deal_opening_hands(club_id, room_id).await {
                log::error!(
                    "Dealing failed in room {}:{}, stopping game {}: {}",
                    club_id,
                    room_id,
                    game_id,
                    e
                );
                metrics::transition_failure("deal");
                self.actions
                    .error(club_id, room_id, REASON_DEAL_FAILED, &e.to_string())
                    .await;
                if let Err(stop_err) = self.stop_game(club_id, room_id, REASON_DEAL_FAILED).await {
                    log::error!(
                        "Could not stop game {} in room {}:{} after failed deal: {}",
                        game_id,
                        club_id,
                        room_id,
                        stop_err
                    );
                }
                return Err(e);
            }
        }

        Ok(StartOutcome::Started { game_id })
    }

    /// Stop the hand in progress and reset the table
    ///
    /// Returns `AlreadyWaiting` without writing or logging anything when the
    /// room has no game record or is already waiting. Otherwise one atomic
    /// batch resets the room and game; player resets follow individually
    /// and a failed player reset is logged and skipped.
    pub async fn stop_game(
        &self,
        club_id: &str,
        room_id: &str,
        reason: &str,
    ) -> EngineResult<StopOutcome> {
        let Some(game) = self.repo.get_game(club_id, room_id).await? else {
            return Ok(StopOutcome::AlreadyWaiting);
        };
        if game.is_waiting() {
            return Ok(StopOutcome::AlreadyWaiting);
        }
        let previous_phase = phase_label(&game.phase);

        let keys = self.repo.keys();
        let batch = WriteBatch::new()
            .hset(
                keys.room_info(club_id, room_id),
                [(room_fields::STATUS, RoomStatus::Waiting.as_str().to_string())],
            )
            .hset(
                keys.game_state(club_id, room_id),
                [
                    (game_fields::PHASE, GamePhase::Waiting.as_str().to_string()),
                    (game_fields::GAME_ID, String::new()),
                    (game_fields::STARTED_AT, String::new()),
                    (game_fields::POT, "0".to_string()),
                    (game_fields::CURRENT_BET, "0".to_string()),
                    (game_fields::CURRENT_PLAYER_POSITION, String::new()),
                    (game_fields::COMMUNITY_CARDS, "[]".to_string()),
                ],
            );
        self.repo.store().execute_batch(batch).await?;

        self.reset_players(club_id, room_id).await;

        metrics::game_stopped(reason);
        self.actions
            .game_stopped(club_id, room_id, &previous_phase, reason)
            .await;
        log::info!(
            "Game stopped in room {}:{} (was {}): {}",
            club_id,
            room_id,
            previous_phase,
            reason
        );
        Ok(StopOutcome::Stopped { previous_phase })
    }

    /// Stop, then discard the deck and zero the pots record
    pub async fn stop_with_cleanup(
        &self,
        club_id: &str,
        room_id: &str,
        reason: &str,
    ) -> EngineResult<StopOutcome> {
        let outcome = self.stop_game(club_id, room_id, reason).await?;

        let keys = self.repo.keys();
        let batch = WriteBatch::new().del(keys.room_deck(club_id, room_id)).hset(
            keys.room_pots(club_id, room_id),
            [
                (pot_fields::MAIN_POT, "0".to_string()),
                (pot_fields::SIDE_POTS, "[]".to_string()),
            ],
        );
        self.repo.store().execute_batch(batch).await?;
        log::debug!("Cleaned deck and pots for room {}:{}", club_id, room_id);
        Ok(outcome)
    }

    /// Stop with cleanup regardless of the seated count
    pub async fn force_stop(
        &self,
        club_id: &str,
        room_id: &str,
        reason: &str,
    ) -> EngineResult<StopOutcome> {
        log::warn!("Force stopping room {}:{}: {}", club_id, room_id, reason);
        self.stop_with_cleanup(club_id, room_id, &format!("{FORCE_STOP_PREFIX}{reason}"))
            .await
    }

    /// Stop only when a hand is active and fewer than `min_players` are seated
    ///
    /// # Returns
    ///
    /// * `EngineResult<bool>` - Whether a stop was performed
    pub async fn stop_if_needed(
        &self,
        club_id: &str,
        room_id: &str,
        min_players: usize,
    ) -> EngineResult<bool> {
        if !self.repo.is_game_active(club_id, room_id).await? {
            return Ok(false);
        }
        let players = self.repo.get_players_count(club_id, room_id).await?;
        if players >= min_players {
            return Ok(false);
        }
        let outcome = self
            .stop_game(club_id, room_id, REASON_INSUFFICIENT_PLAYERS)
            .await?;
        Ok(matches!(outcome, StopOutcome::Stopped { .. }))
    }

    /// Move the hand to `to` and record a `phase_changed` event
    ///
    /// Fails with `InvalidTransition` on an edge the phase graph forbids;
    /// nothing is written or logged in that case.
    pub async fn advance_phase(
        &self,
        club_id: &str,
        room_id: &str,
        to: GamePhase,
    ) -> EngineResult<GamePhase> {
        let from = self.repo.advance_phase(club_id, room_id, to).await?;
        self.actions
            .phase_changed(club_id, room_id, from.as_str(), to.as_str())
            .await;
        Ok(from)
    }

    /// Record the end of the current hand; returns its game id
    pub async fn save_game_results(&self, club_id: &str, room_id: &str) -> EngineResult<String> {
        let game = self.repo.get_game(club_id, room_id).await?;
        match game {
            Some(game) if game.has_active_hand() => {
                log::info!(
                    "Saved results of game {} in room {}:{} (pot {})",
                    game.game_id,
                    club_id,
                    room_id,
                    game.pot
                );
                Ok(game.game_id)
            }
            _ => Err(EngineError::NoActiveHand {
                club_id: club_id.to_string(),
                room_id: room_id.to_string(),
            }),
        }
    }

    async fn deal_opening_hands(&self, club_id: &str, room_id: &str) -> EngineResult<()> {
        self.dealer.clear_all_cards(club_id, room_id).await?;
        self.dealer.deal_hole_cards(club_id, room_id).await?;
        Ok(())
    }

    async fn reset_players(&self, club_id: &str, room_id: &str) {
        let player_ids = match self.repo.get_player_ids(club_id, room_id).await {
            Ok(ids) => ids,
            Err(e) => {
                log::warn!(
                    "Could not list players of room {}:{} for reset: {}",
                    club_id,
                    room_id,
                    e
                );
                return;
            }
        };

        let reset = [
            (player_fields::STATUS, PlayerStatus::Waiting.as_str().to_string()),
            (player_fields::BET, "0".to_string()),
            (player_fields::CARDS, "[]".to_string()),
            (player_fields::LAST_ACTION, String::new()),
            (player_fields::IS_DEALER, format_flag(false).to_string()),
            (player_fields::IS_SMALL_BLIND, format_flag(false).to_string()),
            (player_fields::IS_BIG_BLIND, format_flag(false).to_string()),
        ];
        for user_id in player_ids {
            if let Err(e) = self
                .repo
                .update_player_fields(club_id, room_id, &user_id, &reset)
                .await
            {
                log::warn!(
                    "Failed to reset player {} in room {}:{}: {}",
                    user_id,
                    club_id,
                    room_id,
                    e
                );
            }
        }
    }
}

/// Phase text for logs and events, keeping unrecognized values verbatim
pub fn phase_label(phase: &FieldValue<GamePhase>) -> String {
    match phase {
        FieldValue::Known(phase) => phase.as_str().to_string(),
        FieldValue::Missing => String::new(),
        FieldValue::Unrecognized(raw) => raw.clone(),
    }
}

fn room_not_found(club_id: &str, room_id: &str) -> EngineError {
    EngineError::RoomNotFound {
        club_id: club_id.to_string(),
        room_id: room_id.to_string(),
    }
}
