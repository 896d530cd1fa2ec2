//! Game module: the phase graph and typed room/game/player records.
//!
//! This module provides:
//! - `GamePhase`: the seven-phase hand lifecycle and its legal transitions
//! - `Room`, `Game`, `Player`: records parsed from the shared store
//! - `GameRepository`: reads and single-command batch writes over those records
//! - `EngineError`: errors shared by every engine service

pub mod errors;
pub mod models;
pub mod phase;
pub mod repository;

pub use errors::{EngineError, EngineResult};
pub use models::{
    FieldValue, Game, Player, PlayerAction, PlayerStatus, Room, RoomStatus, SidePot,
};
pub use phase::{GamePhase, can_transition};
pub use repository::GameRepository;
