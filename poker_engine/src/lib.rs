//! # Poker Engine
//!
//! Room lifecycle controller for multiplayer card rooms backed by a shared
//! key/value store.
//!
//! Client-facing servers seat and unseat players by writing to the store.
//! This engine watches those rooms and, on a fixed interval, starts a hand
//! when enough players are seated and stops it when too few remain. Every
//! transition is a single atomic batch, safe to repeat, and tolerant of
//! concurrent writers.
//!
//! ## Architecture
//!
//! - **Store**: `KeyValueStore` trait with Redis and in-memory implementations
//! - **Deck**: card codes, Fisher-Yates shuffle, atomic draws, dealing
//! - **Game**: phase graph and typed room/game/player records
//! - **Actions**: append-only JSON event log per room
//! - **Monitor**: the periodic scan and the start/stop transitions
//!
//! ## Core Modules
//!
//! - [`store`]: store abstraction and key layout
//! - [`game`]: phases, records, repository, errors
//! - [`deck`]: cards, deck storage, dealer
//! - [`monitor`]: lifecycle controller and monitor loop
//!
//! ## Example
//!
//! ```no_run
//! use poker_engine::{Engine, monitor::EngineConfig, store::{KeyBuilder, MemoryStore}};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = Engine::new(Arc::new(MemoryStore::new()), KeyBuilder::new(), EngineConfig::default());
//!     engine.monitor.start().await;
//!     // ...
//!     engine.monitor.stop().await;
//! }
//! ```

/// Append-only per-room action log.
pub mod actions;

/// Cards, deck storage, and dealing.
pub mod deck;

/// Service wiring.
pub mod engine;
pub use engine::Engine;

/// Phase graph, records, repository, and errors.
pub mod game;
pub use game::{EngineError, EngineResult, GamePhase};

/// Engine metrics.
pub mod metrics;

/// Lifecycle controller and monitor loop.
pub mod monitor;

/// Key/value store abstraction.
pub mod store;
