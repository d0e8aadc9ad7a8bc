use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The learner's self-assessment after seeing the back of a card.
///
/// The numeric value doubles as the index into the first four weights
/// (initial stability per rating), so the discriminants are load-bearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again = 0,
    Hard = 1,
    Good = 2,
    Easy = 3,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Rating as a signed magnitude for the difficulty formulas.
    pub fn value(self) -> f64 {
        self as u8 as f64
    }

    pub fn is_failure(self) -> bool {
        self == Rating::Again
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rating::Again),
            1 => Ok(Rating::Hard),
            2 => Ok(Rating::Good),
            3 => Ok(Rating::Easy),
            other => Err(CoreError::InvalidRating(other.to_string())),
        }
    }
}

impl FromStr for Rating {
    type Err = CoreError;

    /// Accepts the rating name (any case) or its digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" | "0" => Ok(Rating::Again),
            "hard" | "1" => Ok(Rating::Hard),
            "good" | "2" => Ok(Rating::Good),
            "easy" | "3" => Ok(Rating::Easy),
            _ => Err(CoreError::InvalidRating(s.to_string())),
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
