//! Room, game, and player records as stored in the shared store.
//!
//! Each record is a flat field-set of text values. Numbers are decimal text
//! and fall back to zero when malformed; booleans accept `true`/`1`;
//! timestamps are RFC 3339; card lists are JSON arrays of card codes.
//! Enumerated fields parse into `FieldValue` so unexpected text written by
//! another process is surfaced instead of silently defaulted.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr};

use super::phase::GamePhase;
use crate::deck::models::{Card, parse_card_list};

/// Game record field names
pub mod game_fields {
    pub const GAME_ID: &str = "game_id";
    pub const PHASE: &str = "phase";
    pub const POT: &str = "pot";
    pub const CURRENT_BET: &str = "current_bet";
    pub const DEALER_POSITION: &str = "dealer_position";
    pub const SMALL_BLIND_POSITION: &str = "small_blind_position";
    pub const BIG_BLIND_POSITION: &str = "big_blind_position";
    pub const CURRENT_PLAYER_POSITION: &str = "current_player_position";
    pub const ROUND_NUMBER: &str = "round_number";
    pub const COMMUNITY_CARDS: &str = "community_cards";
    pub const STARTED_AT: &str = "started_at";
    pub const SIDE_POTS: &str = "side_pots";
}

/// Room record field names
pub mod room_fields {
    pub const ROOM_ID: &str = "room_id";
    pub const CLUB_ID: &str = "club_id";
    pub const KEY: &str = "key";
    pub const MAX_PLAYERS: &str = "max_players";
    pub const SMALL_BLIND: &str = "small_blind";
    pub const BIG_BLIND: &str = "big_blind";
    pub const BUY_IN_MIN: &str = "buy_in_min";
    pub const BUY_IN_MAX: &str = "buy_in_max";
    pub const CURRENCY: &str = "currency";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "created_at";
}

/// Player record field names
pub mod player_fields {
    pub const USER_ID: &str = "user_id";
    pub const USERNAME: &str = "username";
    pub const POSITION: &str = "position";
    pub const CHIPS: &str = "chips";
    pub const BET: &str = "bet";
    pub const CARDS: &str = "cards";
    pub const STATUS: &str = "status";
    pub const LAST_ACTION: &str = "last_action";
    pub const IS_DEALER: &str = "is_dealer";
    pub const IS_SMALL_BLIND: &str = "is_small_blind";
    pub const IS_BIG_BLIND: &str = "is_big_blind";
    pub const JOINED_TABLE_AT: &str = "joined_table_at";
    pub const INITIAL_BUY_IN: &str = "initial_buy_in";
}

/// Pots record field names
pub mod pot_fields {
    pub const MAIN_POT: &str = "main_pot";
    pub const SIDE_POTS: &str = "side_pots";
}

/// A parsed enumerated field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue<T> {
    /// Field held a recognised value
    Known(T),
    /// Field absent or empty
    Missing,
    /// Field held text outside the known set
    Unrecognized(String),
}

impl<T: FromStr> FieldValue<T> {
    /// Parse an optional raw field; empty and `"null"` count as missing
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("null") => FieldValue::Missing,
            Some(text) => match text.parse() {
                Ok(value) => FieldValue::Known(value),
                Err(_) => FieldValue::Unrecognized(text.to_string()),
            },
        }
    }
}

impl<T> FieldValue<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            FieldValue::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, FieldValue::Known(_))
    }
}

impl<T: PartialEq> FieldValue<T> {
    /// True only when the field holds exactly `value`
    pub fn is(&self, value: &T) -> bool {
        self.known() == Some(value)
    }
}

impl<T: fmt::Display> fmt::Display for FieldValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Known(value) => write!(f, "{value}"),
            FieldValue::Missing => f.write_str("<missing>"),
            FieldValue::Unrecognized(raw) => write!(f, "<unrecognized:{raw}>"),
        }
    }
}

/// Implements `as_str`, `Display`, and `FromStr` for a snake_case text enum
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), ": {}"), other)),
                }
            }
        }
    };
}

/// Room lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Waiting,
    Ready,
    Gaming,
    Paused,
    Closed,
}

text_enum!(RoomStatus {
    Waiting => "waiting",
    Ready => "ready",
    Gaming => "gaming",
    Paused => "paused",
    Closed => "closed",
});

/// Seated player status within a hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Waiting,
    Active,
    Folded,
    AllIn,
    SitOut,
}

text_enum!(PlayerStatus {
    Waiting => "waiting",
    Active => "active",
    Folded => "folded",
    AllIn => "all_in",
    SitOut => "sit_out",
});

/// Last betting action taken by a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Check,
    Call,
    Bet,
    Raise,
    Fold,
    AllIn,
    Blind,
}

text_enum!(PlayerAction {
    Check => "check",
    Call => "call",
    Bet => "bet",
    Raise => "raise",
    Fold => "fold",
    AllIn => "all_in",
    Blind => "blind",
});

/// Side pot with the users eligible to win it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidePot {
    pub amount: i64,
    pub eligible_players: Vec<String>,
}

/// Descriptive attributes of a room
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub club_id: String,
    pub room_id: String,
    pub key: String,
    pub max_players: u32,
    pub small_blind: i64,
    pub big_blind: i64,
    pub buy_in_min: i64,
    pub buy_in_max: i64,
    pub currency: String,
    pub status: FieldValue<RoomStatus>,
    pub created_at: Option<DateTime<Utc>>,
    /// Seated player count, read from the players set
    pub current_players: usize,
    /// Spectator count, read from the spectators set
    pub current_spectators: usize,
}

impl Room {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            club_id: text(fields, room_fields::CLUB_ID),
            room_id: text(fields, room_fields::ROOM_ID),
            key: text(fields, room_fields::KEY),
            max_players: number(fields, room_fields::MAX_PLAYERS),
            small_blind: number(fields, room_fields::SMALL_BLIND),
            big_blind: number(fields, room_fields::BIG_BLIND),
            buy_in_min: number(fields, room_fields::BUY_IN_MIN),
            buy_in_max: number(fields, room_fields::BUY_IN_MAX),
            currency: text(fields, room_fields::CURRENCY),
            status: FieldValue::parse(raw(fields, room_fields::STATUS)),
            created_at: timestamp(fields, room_fields::CREATED_AT),
            current_players: 0,
            current_spectators: 0,
        }
    }

    pub fn is_full(&self) -> bool {
        self.current_players >= self.max_players as usize
    }
}

/// Phase-scoped attributes of the hand at a room
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    /// Empty when no hand is in progress
    pub game_id: String,
    pub phase: FieldValue<GamePhase>,
    pub pot: i64,
    pub current_bet: i64,
    pub dealer_position: usize,
    pub small_blind_position: Option<usize>,
    pub big_blind_position: Option<usize>,
    pub current_player_position: Option<usize>,
    pub round_number: u32,
    pub community_cards: Vec<Card>,
    pub started_at: Option<DateTime<Utc>>,
    pub side_pots: Vec<SidePot>,
}

impl Game {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            game_id: text(fields, game_fields::GAME_ID),
            phase: FieldValue::parse(raw(fields, game_fields::PHASE)),
            pot: number(fields, game_fields::POT),
            current_bet: number(fields, game_fields::CURRENT_BET),
            dealer_position: number(fields, game_fields::DEALER_POSITION),
            small_blind_position: optional_number(fields, game_fields::SMALL_BLIND_POSITION),
            big_blind_position: optional_number(fields, game_fields::BIG_BLIND_POSITION),
            current_player_position: optional_number(fields, game_fields::CURRENT_PLAYER_POSITION),
            round_number: number(fields, game_fields::ROUND_NUMBER),
            community_cards: cards(fields, game_fields::COMMUNITY_CARDS),
            started_at: timestamp(fields, game_fields::STARTED_AT),
            side_pots: json_list(fields, game_fields::SIDE_POTS),
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.phase.is(&GamePhase::Waiting)
    }

    /// True when a hand id is set
    pub fn has_active_hand(&self) -> bool {
        !self.game_id.is_empty()
    }
}

/// A seated player
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub user_id: String,
    pub username: String,
    pub position: Option<usize>,
    pub chips: i64,
    pub bet: i64,
    pub cards: Vec<Card>,
    pub status: FieldValue<PlayerStatus>,
    pub last_action: FieldValue<PlayerAction>,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub joined_table_at: Option<DateTime<Utc>>,
    pub initial_buy_in: i64,
}

impl Player {
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        Self {
            user_id: text(fields, player_fields::USER_ID),
            username: text(fields, player_fields::USERNAME),
            position: optional_number(fields, player_fields::POSITION),
            chips: number(fields, player_fields::CHIPS),
            bet: number(fields, player_fields::BET),
            cards: cards(fields, player_fields::CARDS),
            status: FieldValue::parse(raw(fields, player_fields::STATUS)),
            last_action: FieldValue::parse(raw(fields, player_fields::LAST_ACTION)),
            is_dealer: flag(fields, player_fields::IS_DEALER),
            is_small_blind: flag(fields, player_fields::IS_SMALL_BLIND),
            is_big_blind: flag(fields, player_fields::IS_BIG_BLIND),
            joined_table_at: timestamp(fields, player_fields::JOINED_TABLE_AT),
            initial_buy_in: number(fields, player_fields::INITIAL_BUY_IN),
        }
    }

    /// Still contesting the pot
    pub fn is_in_hand(&self) -> bool {
        self.status.is(&PlayerStatus::Active) || self.status.is(&PlayerStatus::AllIn)
    }
}

/// Format a timestamp the way every record stores it
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Encode a boolean flag
pub fn format_flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn raw<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields.get(name).map(String::as_str)
}

fn text(fields: &HashMap<String, String>, name: &str) -> String {
    fields.get(name).cloned().unwrap_or_default()
}

fn number<T: FromStr + Default>(fields: &HashMap<String, String>, name: &str) -> T {
    raw(fields, name)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or_default()
}

fn optional_number<T: FromStr>(fields: &HashMap<String, String>, name: &str) -> Option<T> {
    raw(fields, name).and_then(|v| v.trim().parse().ok())
}

fn flag(fields: &HashMap<String, String>, name: &str) -> bool {
    matches!(raw(fields, name), Some("true") | Some("1"))
}

fn timestamp(fields: &HashMap<String, String>, name: &str) -> Option<DateTime<Utc>> {
    raw(fields, name)
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|at| at.with_timezone(&Utc))
}

fn cards(fields: &HashMap<String, String>, name: &str) -> Vec<Card> {
    match raw(fields, name) {
        None => Vec::new(),
        Some(json) => parse_card_list(json).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed card list in field {}: {}", name, e);
            Vec::new()
        }),
    }
}

fn json_list<T: for<'de> Deserialize<'de>>(fields: &HashMap<String, String>, name: &str) -> Vec<T> {
    match raw(fields, name) {
        None | Some("") => Vec::new(),
        Some(json) => serde_json::from_str(json).unwrap_or_else(|e| {
            log::warn!("Ignoring malformed list in field {}: {}", name, e);
            Vec::new()
        }),
    }
}
