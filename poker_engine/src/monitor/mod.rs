//! Monitor module: the room lifecycle control loop.
//!
//! Every tick the monitor scans each club's active-room index, reads every
//! room's seated count and phase, and applies one rule per room:
//!
//! - enough players and waiting: start a hand
//! - too few players and not waiting: stop the hand (`insufficient_players`)
//! - otherwise: nothing
//!
//! There is no hysteresis. A room hovering at the threshold may start and
//! stop on consecutive ticks.

pub mod config;
pub mod controller;
pub mod room_monitor;

pub use config::{EngineConfig, EngineConfigError, parse_duration};
pub use controller::{
    FORCE_STOP_PREFIX, LifecycleController, REASON_DEAL_FAILED, REASON_INSUFFICIENT_PLAYERS,
    StartOutcome, StopOutcome,
};
pub use room_monitor::{
    MonitorStatistics, RoomAction, RoomDecision, RoomMonitor, TickReport, decide,
};
