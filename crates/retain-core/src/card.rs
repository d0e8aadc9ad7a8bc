use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rating::Rating;

/// Lifecycle of a scheduling record. `New → Review` on the first rating; never reverts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CardState {
    #[default]
    New,
    Review,
}

impl CardState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "review" => Some(Self::Review),
            _ => None,
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-item scheduling state. Timestamps are Unix milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    pub id: String,
    pub deck: String,
    pub state: CardState,
    pub stability: f64,
    pub difficulty: f64,
    pub due: i64,
    pub reps: u32,
    pub lapses: u32,
    #[serde(default)]
    pub last_reviewed: i64,
    /// Optimistic concurrency counter, bumped on every committed rating.
    #[serde(default)]
    pub version: u64,
}

impl CardRecord {
    /// A never-reviewed record, due immediately.
    pub fn new(id: impl Into<String>, deck: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            deck: deck.into(),
            state: CardState::New,
            stability: 0.0,
            difficulty: 0.0,
            due: 0,
            reps: 0,
            lapses: 0,
            last_reviewed: 0,
            version: 0,
        }
    }

    pub fn is_new(&self) -> bool {
        self.state == CardState::New
    }

    pub fn is_due(&self, now: i64) -> bool {
        self.due <= now
    }

    pub fn matches_deck(&self, deck: Option<&str>) -> bool {
        deck.is_none_or(|d| self.deck == d)
    }
}

/// One rating event. Immutable once logged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEvent {
    /// Assigned by the review log on append; `None` before that.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub card_id: String,
    pub rating: Rating,
    pub elapsed_days: f64,
    pub stability: f64,
    pub difficulty: f64,
    pub interval: u32,
    /// Unix milliseconds; 0 means "stamp with the current time on append".
    #[serde(default)]
    pub timestamp: i64,
}

/// Deterministic identity for a catalog item.
///
/// FNV-1a 64-bit over `front + back + deck`, rendered as 16 hex digits.
/// Moving an item to another deck changes its id. Distinct items can in
/// principle collide; that risk is accepted.
pub fn card_id(front: &str, back: &str, deck: &str) -> String {
    let mut h = fnv1a64_start();
    for part in [front, back, deck] {
        h = fnv1a64_update(h, part.as_bytes());
    }
    format!("{h:016x}")
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a64_start() -> u64 {
    FNV_OFFSET
}

fn fnv1a64_update(mut h: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        h ^= b as u64;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_id_is_deterministic() {
        let a = card_id("kitab", "book", "nouns");
        let b = card_id("kitab", "book", "nouns");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_card_id_includes_deck() {
        assert_ne!(card_id("kitab", "book", "nouns"), card_id("kitab", "book", "verbs"));
    }

    #[test]
    fn test_card_id_is_concatenation() {
        // The hash covers the concatenated string, so field boundaries are not encoded.
        assert_eq!(card_id("ab", "c", "d"), card_id("a", "bc", "d"));
    }

    #[test]
    fn test_fnv_known_vector() {
        // FNV-1a 64 of the empty string is the offset basis.
        assert_eq!(card_id("", "", ""), "cbf29ce484222325");
        // FNV-1a 64 of "a"
        assert_eq!(card_id("a", "", ""), "af63dc4c8601ec8c");
    }

    #[test]
    fn test_new_record_is_due_immediately() {
        let card = CardRecord::new("x", "deck");
        assert!(card.is_new());
        assert!(card.is_due(0));
        assert_eq!(card.last_reviewed, 0);
    }

    #[test]
    fn test_matches_deck() {
        let card = CardRecord::new("x", "nouns");
        assert!(card.matches_deck(None));
        assert!(card.matches_deck(Some("nouns")));
        assert!(!card.matches_deck(Some("verbs")));
    }

    #[test]
    fn test_record_json_is_camel_case() {
        let card = CardRecord::new("x", "nouns");
        let json = serde_json::to_value(&card).unwrap();
        assert!(json.get("lastReviewed").is_some());
        assert_eq!(json["state"], "new");
    }

    #[test]
    fn test_record_without_version_deserializes() {
        let json = r#"{"id":"x","deck":"d","state":"review","stability":2.0,
            "difficulty":5.0,"due":10,"reps":1,"lapses":0,"lastReviewed":5}"#;
        let card: CardRecord = serde_json::from_str(json).unwrap();
        assert_eq!(card.version, 0);
        assert_eq!(card.state, CardState::Review);
    }
}
