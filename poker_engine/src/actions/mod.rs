//! Action log module: an append-only audit trail per room.
//!
//! Events are JSON objects `{action, timestamp, source, data?}` appended to
//! the room's `actions` list. Writes made on behalf of lifecycle transitions
//! are best-effort.

pub mod logger;
pub mod models;

pub use logger::{ActionLogger, ActionSink};
pub use models::{ActionEvent, ActionType, DEFAULT_HISTORY_LIMIT, ENGINE_SOURCE};
