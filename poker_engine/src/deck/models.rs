//! Card and deck value types.

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr, sync::Mutex};
use thiserror::Error;

/// Number of cards in a full deck
pub const DECK_SIZE: usize = 52;

/// Card suit, in canonical deck order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Hearts, Suit::Diamonds, Suit::Clubs, Suit::Spades];

    pub fn code(self) -> char {
        match self {
            Suit::Hearts => 'H',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Spades => 'S',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    fn glyph(self) -> char {
        match self {
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
            Suit::Spades => '♠',
        }
    }
}

/// Card rank, in canonical deck order (ace first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn code(self) -> char {
        match self {
            Rank::Ace => 'A',
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
        }
    }

    fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }
}

/// Error returned when a card code cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid card code: {0:?}")]
pub struct CardParseError(pub String);

/// A playing card, stored and transmitted as its two-character code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Two-character code, rank then suit (`"AH"`, `"TD"`)
    pub fn code(&self) -> String {
        format!("{}{}", self.rank.code(), self.suit.code())
    }

    /// Display form with a suit glyph (`"A♥"`)
    pub fn pretty(&self) -> String {
        format!("{}{}", self.rank.code(), self.suit.glyph())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.code(), self.suit.code())
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(su), None) => match (Rank::from_code(r), Suit::from_code(su)) {
                (Some(rank), Some(suit)) => Ok(Card { rank, suit }),
                _ => Err(CardParseError(s.to_string())),
            },
            _ => Err(CardParseError(s.to_string())),
        }
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        code.parse().map_err(serde::de::Error::custom)
    }
}

/// The 52-card set in canonical order: suits H, D, C, S; ranks A, 2..9, T, J, Q, K
pub fn new_deck() -> Vec<Card> {
    Suit::ALL
        .into_iter()
        .flat_map(|suit| Rank::ALL.into_iter().map(move |rank| Card { rank, suit }))
        .collect()
}

/// Fisher-Yates shuffle returning a new, uniformly permuted sequence
///
/// Walks from the last index down to 1, swapping each position with a
/// uniformly chosen index in `[0, i]`.
pub fn shuffle<R: Rng + ?Sized>(cards: &[Card], rng: &mut R) -> Vec<Card> {
    let mut shuffled = cards.to_vec();
    for i in (1..shuffled.len()).rev() {
        let j = rng.random_range(0..=i);
        shuffled.swap(i, j);
    }
    shuffled
}

/// Shared random source for deck shuffling
///
/// Production seeds once from OS entropy; tests pass a fixed seed to get
/// reproducible orders.
#[derive(Debug)]
pub struct Shuffler {
    rng: Mutex<StdRng>,
}

impl Shuffler {
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Shuffle a copy of `cards`
    pub fn shuffle(&self, cards: &[Card]) -> Vec<Card> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        shuffle(cards, &mut *rng)
    }

    /// A freshly generated, shuffled deck
    pub fn shuffled_deck(&self) -> Vec<Card> {
        self.shuffle(&new_deck())
    }
}

impl Default for Shuffler {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Parse a JSON array of card codes; one bad code fails the whole list
pub fn parse_card_list(json: &str) -> Result<Vec<Card>, serde_json::Error> {
    if json.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(json)
}

/// Encode cards as a JSON array of codes
pub fn encode_card_list(cards: &[Card]) -> String {
    let codes: Vec<String> = cards.iter().map(Card::code).collect();
    serde_json::Value::from(codes).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_new_deck_has_52_unique_codes() {
        let deck = new_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        let codes: HashSet<String> = deck.iter().map(Card::code).collect();
        assert_eq!(codes.len(), DECK_SIZE);
        assert!(codes.iter().all(|c| c.chars().count() == 2));
    }

    #[test]
    fn test_new_deck_canonical_order() {
        let deck = new_deck();
        assert_eq!(deck[0].code(), "AH");
        assert_eq!(deck[12].code(), "KH");
        assert_eq!(deck[13].code(), "AD");
        assert_eq!(deck[51].code(), "KS");
    }

    #[test]
    fn test_card_parse() {
        assert_eq!("TD".parse::<Card>().unwrap(), Card::new(Rank::Ten, Suit::Diamonds));
        assert!("1H".parse::<Card>().is_err());
        assert!("AX".parse::<Card>().is_err());
        assert!("AHH".parse::<Card>().is_err());
        assert!("".parse::<Card>().is_err());
    }

    #[test]
    fn test_card_display_and_pretty() {
        let card = Card::new(Rank::Ace, Suit::Hearts);
        assert_eq!(card.to_string(), "AH");
        assert_eq!(card.pretty(), "A♥");
        assert_eq!(Card::new(Rank::King, Suit::Spades).pretty(), "K♠");
    }

    #[test]
    fn test_card_serializes_as_code() {
        let cards = vec![Card::new(Rank::Ace, Suit::Spades), Card::new(Rank::Two, Suit::Clubs)];
        let json = encode_card_list(&cards);
        assert_eq!(json, r#"["AS","2C"]"#);
        assert_eq!(parse_card_list(&json).unwrap(), cards);
        assert_eq!(serde_json::to_string(&cards).unwrap(), json);
    }

    #[test]
    fn test_parse_card_list_empty_inputs() {
        assert!(parse_card_list("").unwrap().is_empty());
        assert!(parse_card_list("[]").unwrap().is_empty());
        assert!(parse_card_list(r#"["ZZ"]"#).is_err());
    }

    #[test]
    fn test_seeded_shuffler_is_reproducible() {
        let a = Shuffler::seeded(7).shuffled_deck();
        let b = Shuffler::seeded(7).shuffled_deck();
        let c = Shuffler::seeded(8).shuffled_deck();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_shuffle_of_short_inputs() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(shuffle(&[], &mut rng).is_empty());
        let one = vec![Card::new(Rank::Ace, Suit::Hearts)];
        assert_eq!(shuffle(&one, &mut rng), one);
    }
}
