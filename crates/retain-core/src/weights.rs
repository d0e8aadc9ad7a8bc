//! The 19-parameter FSRS-5 weight vector.
//!
//! Positions in the vector carry meaning (w0..w3 are the initial stability
//! per rating, w4/w5 shape initial difficulty, and so on). Callers go through
//! the role-named accessors below instead of indexing by hand.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::rating::Rating;

pub const WEIGHT_COUNT: usize = 19;

/// FSRS-5 defaults.
pub const DEFAULT_WEIGHTS: [f64; WEIGHT_COUNT] = [
    0.4072, 1.1829, 3.1262, 15.4722, 7.2102, 0.5316, 1.0651, 0.0234, 1.616, 0.1544, 1.0824,
    1.9813, 0.0953, 0.2975, 2.2042, 0.2407, 2.9466, 0.5034, 0.6567,
];

const INIT_DIFFICULTY_BASE: usize = 4;
const INIT_DIFFICULTY_SLOPE: usize = 5;
const DIFFICULTY_STEP: usize = 6;
const MEAN_REVERSION: usize = 7;
const RECALL_SCALE: usize = 8;
const RECALL_STABILITY_DECAY: usize = 9;
const RECALL_RETRIEVABILITY_GAIN: usize = 10;
const FORGET_SCALE: usize = 11;
const FORGET_DIFFICULTY_DECAY: usize = 12;
const FORGET_STABILITY_EXP: usize = 13;
const FORGET_RETRIEVABILITY_GAIN: usize = 14;
const HARD_PENALTY: usize = 15;
const EASY_BONUS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Weights([f64; WEIGHT_COUNT]);

impl Default for Weights {
    fn default() -> Self {
        Self(DEFAULT_WEIGHTS)
    }
}

impl Weights {
    pub fn new(values: [f64; WEIGHT_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// w0..w3: stability after the first rating of a new card.
    pub fn initial_stability(&self, rating: Rating) -> f64 {
        self.0[rating.index()]
    }

    pub fn init_difficulty_base(&self) -> f64 {
        self.0[INIT_DIFFICULTY_BASE]
    }

    pub fn init_difficulty_slope(&self) -> f64 {
        self.0[INIT_DIFFICULTY_SLOPE]
    }

    pub fn difficulty_step(&self) -> f64 {
        self.0[DIFFICULTY_STEP]
    }

    pub fn mean_reversion(&self) -> f64 {
        self.0[MEAN_REVERSION]
    }

    pub fn recall_scale(&self) -> f64 {
        self.0[RECALL_SCALE]
    }

    pub fn recall_stability_decay(&self) -> f64 {
        self.0[RECALL_STABILITY_DECAY]
    }

    pub fn recall_retrievability_gain(&self) -> f64 {
        self.0[RECALL_RETRIEVABILITY_GAIN]
    }

    pub fn forget_scale(&self) -> f64 {
        self.0[FORGET_SCALE]
    }

    pub fn forget_difficulty_decay(&self) -> f64 {
        self.0[FORGET_DIFFICULTY_DECAY]
    }

    pub fn forget_stability_exp(&self) -> f64 {
        self.0[FORGET_STABILITY_EXP]
    }

    pub fn forget_retrievability_gain(&self) -> f64 {
        self.0[FORGET_RETRIEVABILITY_GAIN]
    }

    pub fn hard_penalty(&self) -> f64 {
        self.0[HARD_PENALTY]
    }

    pub fn easy_bonus(&self) -> f64 {
        self.0[EASY_BONUS]
    }
}

impl TryFrom<Vec<f64>> for Weights {
    type Error = CoreError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        let actual = values.len();
        let arr: [f64; WEIGHT_COUNT] = values
            .try_into()
            .map_err(|_| CoreError::InvalidWeights {
                expected: WEIGHT_COUNT,
                actual,
            })?;
        if arr.iter().any(|w| !w.is_finite()) {
            return Err(CoreError::InvalidParameter(
                "weights must be finite".to_string(),
            ));
        }
        Ok(Self(arr))
    }
}

impl From<Weights> for Vec<f64> {
    fn from(w: Weights) -> Self {
        w.0.to_vec()
    }
}
