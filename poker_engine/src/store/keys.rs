//! Key layout for room, game, and player records.
//!
//! Every key the engine touches is built here so the layout lives in one
//! place. A `KeyBuilder` is constructed once and handed to each service;
//! the optional namespace lets several deployments (or test runs) share a
//! single store without colliding.

/// Builds store keys for clubs, rooms, and players
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBuilder {
    namespace: String,
}

impl KeyBuilder {
    /// Create a key builder with no namespace prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key builder whose keys are all prefixed with `namespace:`
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let namespace = if namespace.is_empty() || namespace.ends_with(':') {
            namespace
        } else {
            format!("{namespace}:")
        };
        Self { namespace }
    }

    /// Namespace prefix (including trailing colon), empty if none
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Sorted set of active room ids for a club
    pub fn club_rooms_active(&self, club_id: &str) -> String {
        format!("{}club:{club_id}:rooms:active", self.namespace)
    }

    /// Scan pattern matching every club's active room index
    pub fn club_rooms_active_pattern(&self) -> String {
        format!("{}club:*:rooms:active", self.namespace)
    }

    pub fn room_info(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "info")
    }

    pub fn game_state(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "game")
    }

    pub fn room_players(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "players")
    }

    pub fn room_spectators(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "spectators")
    }

    pub fn room_actions(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "actions")
    }

    pub fn room_turn_order(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "turn_order")
    }

    pub fn room_occupied_seats(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "occupied_seats")
    }

    pub fn room_deck(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "deck")
    }

    pub fn room_pots(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "pots")
    }

    pub fn room_timers(&self, club_id: &str, room_id: &str) -> String {
        self.room_key(club_id, room_id, "timers")
    }

    /// Per-player field record
    pub fn player_info(&self, club_id: &str, room_id: &str, user_id: &str) -> String {
        format!(
            "{}club:{club_id}:room:{room_id}:player:{user_id}",
            self.namespace
        )
    }

    /// Per-spectator field record
    pub fn spectator_info(&self, club_id: &str, room_id: &str, user_id: &str) -> String {
        format!(
            "{}club:{club_id}:room:{room_id}:spectator:{user_id}",
            self.namespace
        )
    }

    /// Reverse index from a user to the room they currently occupy
    pub fn user_current_room(&self, club_id: &str, user_id: &str) -> String {
        format!("{}club:{club_id}:user:{user_id}:current_room", self.namespace)
    }

    /// Every per-room key purged when a room is destroyed (player records excluded)
    pub fn room_keys(&self, club_id: &str, room_id: &str) -> Vec<String> {
        vec![
            self.room_info(club_id, room_id),
            self.game_state(club_id, room_id),
            self.room_players(club_id, room_id),
            self.room_spectators(club_id, room_id),
            self.room_actions(club_id, room_id),
            self.room_turn_order(club_id, room_id),
            self.room_occupied_seats(club_id, room_id),
            self.room_deck(club_id, room_id),
            self.room_pots(club_id, room_id),
            self.room_timers(club_id, room_id),
        ]
    }

    /// Extract the club id from any `club:{id}:...` key
    ///
    /// Returns `None` for keys outside this builder's namespace or without a
    /// non-empty club segment followed by further segments.
    pub fn extract_club_id<'a>(&self, key: &'a str) -> Option<&'a str> {
        let rest = key.strip_prefix(self.namespace.as_str())?;
        let rest = rest.strip_prefix("club:")?;
        let (club_id, tail) = rest.split_once(':')?;
        if club_id.is_empty() || tail.is_empty() {
            return None;
        }
        Some(club_id)
    }

    /// Extract the room id from a `...:room:{id}...` key
    pub fn extract_room_id<'a>(&self, key: &'a str) -> Option<&'a str> {
        let (_, rest) = key.split_once(":room:")?;
        let room_id = rest.split(':').next()?;
        (!room_id.is_empty()).then_some(room_id)
    }

    /// Extract the trailing user id from a player/spectator key
    pub fn extract_user_id<'a>(&self, key: &'a str) -> Option<&'a str> {
        let (_, user_id) = key.rsplit_once(':')?;
        (!user_id.is_empty()).then_some(user_id)
    }

    fn room_key(&self, club_id: &str, room_id: &str, suffix: &str) -> String {
        format!("{}club:{club_id}:room:{room_id}:{suffix}", self.namespace)
    }
}
