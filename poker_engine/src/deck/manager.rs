//! Per-room deck storage.

use std::sync::Arc;

use super::models::{Card, DECK_SIZE};
use crate::{
    game::errors::{EngineError, EngineResult},
    store::{KeyBuilder, KeyValueStore, WriteBatch},
};

/// Stores each room's deck as a list and draws from its tail
///
/// A draw is a single atomic pop, so concurrent drawers never receive the
/// same card and a deck can never hand out more than it holds.
#[derive(Clone)]
pub struct DeckManager {
    store: Arc<dyn KeyValueStore>,
    keys: KeyBuilder,
}

impl DeckManager {
    pub fn new(store: Arc<dyn KeyValueStore>, keys: KeyBuilder) -> Self {
        Self { store, keys }
    }

    /// Replace the room's deck with `cards`; the last card is drawn first
    pub async fn save_deck(&self, club_id: &str, room_id: &str, cards: &[Card]) -> EngineResult<()> {
        let key = self.keys.room_deck(club_id, room_id);
        let codes: Vec<String> = cards.iter().map(Card::code).collect();
        let batch = WriteBatch::new().del(key.clone()).rpush(key, codes);
        self.store.execute_batch(batch).await?;
        log::debug!(
            "Saved deck of {} cards for room {}:{}",
            cards.len(),
            club_id,
            room_id
        );
        Ok(())
    }

    /// Draw the top card, or `None` once the deck is exhausted
    pub async fn draw_one(&self, club_id: &str, room_id: &str) -> EngineResult<Option<Card>> {
        let key = self.keys.room_deck(club_id, room_id);
        let Some(code) = self.store.rpop(&key).await? else {
            return Ok(None);
        };
        let card = code.parse().map_err(|_| EngineError::CorruptField {
            field: key,
            reason: format!("invalid card code {code:?}"),
        })?;
        Ok(Some(card))
    }

    /// Draw up to `count` cards, stopping early if the deck runs out
    pub async fn draw_n(&self, club_id: &str, room_id: &str, count: usize) -> EngineResult<Vec<Card>> {
        let mut cards = Vec::with_capacity(count.min(DECK_SIZE));
        for _ in 0..count {
            match self.draw_one(club_id, room_id).await? {
                Some(card) => cards.push(card),
                None => break,
            }
        }
        Ok(cards)
    }

    /// Cards remaining in the deck
    pub async fn deck_size(&self, club_id: &str, room_id: &str) -> EngineResult<usize> {
        Ok(self.store.llen(&self.keys.room_deck(club_id, room_id)).await?)
    }

    pub async fn delete_deck(&self, club_id: &str, room_id: &str) -> EngineResult<()> {
        self.store
            .del(&[self.keys.room_deck(club_id, room_id)])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::models::{Rank, Suit, new_deck};
    use crate::store::MemoryStore;

    fn manager() -> (Arc<MemoryStore>, DeckManager) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), DeckManager::new(store, KeyBuilder::new()))
    }

    #[tokio::test]
    async fn test_draws_from_the_end() {
        let (_, decks) = manager();
        let cards = vec![
            Card::new(Rank::Ace, Suit::Hearts),
            Card::new(Rank::King, Suit::Spades),
        ];
        decks.save_deck("1", "1", &cards).await.unwrap();
        assert_eq!(decks.draw_one("1", "1").await.unwrap(), Some(cards[1]));
        assert_eq!(decks.draw_one("1", "1").await.unwrap(), Some(cards[0]));
        assert_eq!(decks.draw_one("1", "1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_replaces_existing_deck() {
        let (_, decks) = manager();
        decks.save_deck("1", "1", &new_deck()).await.unwrap();
        decks
            .save_deck("1", "1", &[Card::new(Rank::Two, Suit::Clubs)])
            .await
            .unwrap();
        assert_eq!(decks.deck_size("1", "1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_draw_n_stops_when_empty() {
        let (_, decks) = manager();
        decks.save_deck("1", "1", &new_deck()[..3]).await.unwrap();
        let drawn = decks.draw_n("1", "1", 5).await.unwrap();
        assert_eq!(drawn.len(), 3);
        assert_eq!(decks.deck_size("1", "1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_card_is_reported() {
        let (store, decks) = manager();
        store
            .rpush("club:1:room:1:deck", &["ZZ".to_string()])
            .await
            .unwrap();
        let err = decks.draw_one("1", "1").await.unwrap_err();
        assert!(matches!(err, EngineError::CorruptField { .. }));
    }

    #[tokio::test]
    async fn test_save_fails_when_store_offline() {
        let (store, decks) = manager();
        store.set_offline(true);
        let err = decks.save_deck("1", "1", &new_deck()).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
