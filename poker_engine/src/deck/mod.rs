//! Deck module: card values, per-room deck storage, and dealing.
//!
//! This module implements:
//! - Card codes and the canonical 52-card deck
//! - Fisher-Yates shuffling over an injectable random source
//! - Atomic draw-without-replacement against the shared store
//! - Hole card and community card dealing
//!
//! ## Example
//!
//! ```no_run
//! use poker_engine::deck::{DeckManager, Shuffler};
//! use poker_engine::store::{KeyBuilder, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let decks = DeckManager::new(Arc::new(MemoryStore::new()), KeyBuilder::new());
//!     let deck = Shuffler::from_entropy().shuffled_deck();
//!     decks.save_deck("1", "7", &deck).await?;
//!
//!     let card = decks.draw_one("1", "7").await?;
//!     println!("Top card: {:?}", card.map(|c| c.pretty()));
//!     Ok(())
//! }
//! ```

pub mod dealer;
pub mod manager;
pub mod models;

pub use dealer::{CardDealer, HOLE_CARDS};
pub use manager::DeckManager;
pub use models::{Card, CardParseError, DECK_SIZE, Rank, Shuffler, Suit, new_deck, shuffle};
