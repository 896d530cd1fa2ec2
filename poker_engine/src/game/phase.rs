//! Game phase graph.
//!
//! A hand moves `waiting -> pre_flop -> flop -> turn -> river -> showdown ->
//! finished -> waiting`. Any betting street may collapse straight to
//! showdown or finished when all but one player fold, and a finished or
//! showdown table may go straight into the next hand.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Phase of the hand in progress at a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    Finished,
}

impl GamePhase {
    pub const ALL: [GamePhase; 7] = [
        GamePhase::Waiting,
        GamePhase::PreFlop,
        GamePhase::Flop,
        GamePhase::Turn,
        GamePhase::River,
        GamePhase::Showdown,
        GamePhase::Finished,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Waiting => "waiting",
            GamePhase::PreFlop => "pre_flop",
            GamePhase::Flop => "flop",
            GamePhase::Turn => "turn",
            GamePhase::River => "river",
            GamePhase::Showdown => "showdown",
            GamePhase::Finished => "finished",
        }
    }

    /// Phases reachable in one step from `self`
    pub fn allowed_transitions(self) -> &'static [GamePhase] {
        use GamePhase::*;
        match self {
            Waiting => &[PreFlop],
            PreFlop => &[Flop, Showdown, Finished],
            Flop => &[Turn, Showdown, Finished],
            Turn => &[River, Showdown, Finished],
            River => &[Showdown, Finished],
            Showdown => &[Finished, PreFlop],
            Finished => &[Waiting, PreFlop],
        }
    }

    pub fn can_transition_to(self, to: GamePhase) -> bool {
        self.allowed_transitions().contains(&to)
    }

    /// Canonical successor along the happy path
    pub fn next(self) -> GamePhase {
        match self {
            GamePhase::Waiting => GamePhase::PreFlop,
            GamePhase::PreFlop => GamePhase::Flop,
            GamePhase::Flop => GamePhase::Turn,
            GamePhase::Turn => GamePhase::River,
            GamePhase::River => GamePhase::Showdown,
            GamePhase::Showdown => GamePhase::Finished,
            GamePhase::Finished => GamePhase::Waiting,
        }
    }

    /// True between the first deal and the end of the hand
    pub fn is_hand_in_progress(self) -> bool {
        !matches!(self, GamePhase::Waiting | GamePhase::Finished)
    }

    /// Number of community cards revealed on entering this street, if any
    pub fn community_cards_to_reveal(self) -> Option<usize> {
        match self {
            GamePhase::Flop => Some(3),
            GamePhase::Turn | GamePhase::River => Some(1),
            _ => None,
        }
    }
}

/// Free-function form of `GamePhase::can_transition_to`
pub fn can_transition(from: GamePhase, to: GamePhase) -> bool {
    from.can_transition_to(to)
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GamePhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GamePhase::ALL
            .into_iter()
            .find(|phase| phase.as_str() == s)
            .ok_or_else(|| format!("unknown game phase: {s}"))
    }
}
