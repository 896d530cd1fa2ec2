//! Card dealing on top of the deck store.

use std::{collections::HashMap, sync::Arc};

use super::{
    manager::DeckManager,
    models::{Card, Shuffler, encode_card_list},
};
use crate::{
    actions::ActionSink,
    game::{
        errors::{EngineError, EngineResult},
        models::{game_fields, player_fields},
        phase::GamePhase,
        repository::GameRepository,
    },
    metrics,
};

/// Hole cards dealt to each player
pub const HOLE_CARDS: usize = 2;

/// Community card counts a board may hold
const BOARD_SIZES: [usize; 4] = [0, 3, 4, 5];

/// Sequences shuffling, hole-card distribution, and community reveals
///
/// Community dealing assumes a single writer per room: the board is read,
/// extended, and written back without isolation.
#[derive(Clone)]
pub struct CardDealer {
    repo: GameRepository,
    decks: DeckManager,
    shuffler: Arc<Shuffler>,
    actions: Arc<dyn ActionSink>,
}

impl CardDealer {
    pub fn new(
        repo: GameRepository,
        decks: DeckManager,
        shuffler: Arc<Shuffler>,
        actions: Arc<dyn ActionSink>,
    ) -> Self {
        Self {
            repo,
            decks,
            shuffler,
            actions,
        }
    }

    pub fn decks(&self) -> &DeckManager {
        &self.decks
    }

    /// Shuffle a fresh deck and deal two cards to every seated player
    ///
    /// Players are served in ascending user-id order. All cards are drawn
    /// before any player record is written, so an exhausted deck leaves
    /// player hands untouched.
    ///
    /// # Returns
    ///
    /// * `EngineResult<Vec<(String, Vec<Card>)>>` - Each user id with their cards
    pub async fn deal_hole_cards(
        &self,
        club_id: &str,
        room_id: &str,
    ) -> EngineResult<Vec<(String, Vec<Card>)>> {
        let player_ids = self.repo.get_player_ids(club_id, room_id).await?;
        if player_ids.is_empty() {
            return Err(EngineError::NoPlayers {
                club_id: club_id.to_string(),
                room_id: room_id.to_string(),
            });
        }

        let deck = self.shuffler.shuffled_deck();
        self.decks.save_deck(club_id, room_id, &deck).await?;

        let mut hands = Vec::with_capacity(player_ids.len());
        for user_id in player_ids {
            let cards = self.decks.draw_n(club_id, room_id, HOLE_CARDS).await?;
            if cards.len() < HOLE_CARDS {
                return Err(EngineError::DeckExhausted {
                    needed: HOLE_CARDS,
                    drawn: cards.len(),
                });
            }
            hands.push((user_id, cards));
        }

        for (user_id, cards) in &hands {
            self.repo
                .update_player_fields(
                    club_id,
                    room_id,
                    user_id,
                    &[(player_fields::CARDS, encode_card_list(cards))],
                )
                .await?;
        }

        metrics::cards_dealt(hands.len() * HOLE_CARDS);
        self.actions.cards_dealt(club_id, room_id, hands.len()).await;
        log::info!(
            "Dealt hole cards to {} players in room {}:{}",
            hands.len(),
            club_id,
            room_id
        );
        Ok(hands)
    }

    /// Reveal `count` community cards and return exactly the new ones
    pub async fn deal_community_cards(
        &self,
        club_id: &str,
        room_id: &str,
        count: usize,
    ) -> EngineResult<Vec<Card>> {
        let mut board = self.current_board(club_id, room_id).await?;
        validate_community_deal(board.len(), count)?;

        let drawn = self.decks.draw_n(club_id, room_id, count).await?;
        if drawn.len() < count {
            return Err(EngineError::DeckExhausted {
                needed: count,
                drawn: drawn.len(),
            });
        }

        board.extend_from_slice(&drawn);
        self.repo
            .update_game_fields(
                club_id,
                room_id,
                &[(game_fields::COMMUNITY_CARDS, encode_card_list(&board))],
            )
            .await?;
        metrics::cards_dealt(drawn.len());
        Ok(drawn)
    }

    /// Draw and discard the top card
    pub async fn burn_card(&self, club_id: &str, room_id: &str) -> EngineResult<Card> {
        self.decks
            .draw_one(club_id, room_id)
            .await?
            .ok_or(EngineError::DeckExhausted { needed: 1, drawn: 0 })
    }

    /// Burn one card, then reveal the cards for `phase` (3 on the flop, 1 on turn and river)
    pub async fn deal_street(
        &self,
        club_id: &str,
        room_id: &str,
        phase: GamePhase,
    ) -> EngineResult<Vec<Card>> {
        let board = self.current_board(club_id, room_id).await?;
        let count = phase.community_cards_to_reveal().ok_or(
            EngineError::InvalidCommunityCount {
                current: board.len(),
                requested: 0,
            },
        )?;
        validate_community_deal(board.len(), count)?;

        self.burn_card(club_id, room_id).await?;
        let cards = self.deal_community_cards(club_id, room_id, count).await?;
        self.actions
            .community_cards_revealed(club_id, room_id, phase.as_str(), cards.len())
            .await;
        Ok(cards)
    }

    /// Reset every seated player's hole cards, empty the board, and drop the deck
    pub async fn clear_all_cards(&self, club_id: &str, room_id: &str) -> EngineResult<()> {
        let empty = encode_card_list(&[]);
        for user_id in self.repo.get_player_ids(club_id, room_id).await? {
            self.repo
                .update_player_fields(club_id, room_id, &user_id, &[(player_fields::CARDS, empty.clone())])
                .await?;
        }
        if self.repo.get_game(club_id, room_id).await?.is_some() {
            self.repo
                .update_game_fields(club_id, room_id, &[(game_fields::COMMUNITY_CARDS, empty)])
                .await?;
        }
        self.decks.delete_deck(club_id, room_id).await
    }

    /// A player's hole cards; empty when the player has none or is not seated
    pub async fn get_player_cards(
        &self,
        club_id: &str,
        room_id: &str,
        user_id: &str,
    ) -> EngineResult<Vec<Card>> {
        Ok(self
            .repo
            .get_player(club_id, room_id, user_id)
            .await?
            .map(|p| p.cards)
            .unwrap_or_default())
    }

    /// Every seated player's hole cards keyed by user id
    pub async fn get_all_player_cards(
        &self,
        club_id: &str,
        room_id: &str,
    ) -> EngineResult<HashMap<String, Vec<Card>>> {
        let players = self.repo.get_players(club_id, room_id).await?;
        Ok(players.into_iter().map(|p| (p.user_id, p.cards)).collect())
    }

    async fn current_board(&self, club_id: &str, room_id: &str) -> EngineResult<Vec<Card>> {
        self.repo
            .get_game(club_id, room_id)
            .await?
            .map(|game| game.community_cards)
            .ok_or_else(|| EngineError::RoomNotFound {
                club_id: club_id.to_string(),
                room_id: room_id.to_string(),
            })
    }
}

/// Reject deals that would leave the board at a size other than 0, 3, 4, or 5
fn validate_community_deal(current: usize, requested: usize) -> EngineResult<()> {
    let invalid = || EngineError::InvalidCommunityCount { current, requested };
    let after = current.checked_add(requested).ok_or_else(invalid)?;
    if requested == 0 || !BOARD_SIZES.contains(&current) || !BOARD_SIZES.contains(&after) {
        return Err(invalid());
    }
    Ok(())
}
