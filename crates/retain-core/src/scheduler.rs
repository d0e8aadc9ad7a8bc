//! FSRS-style memory model.
//!
//! Pure and synchronous: every function here is total over its valid input
//! domain and depends only on its arguments and the bound parameters.
//!
//! ## Core formulas
//! - Retrievability: R(t, S) = (1 + FACTOR · t / S)^DECAY
//! - Interval: I(S) = S / FACTOR · (R_target^(1/DECAY) − 1)
//! - Initial difficulty: D0(G) = w4 − e^(w5·(G−1)) + 1, G ∈ {0, 1, 2, 3}

use serde::{Deserialize, Serialize};

use crate::card::{CardRecord, CardState};
use crate::constants::{
    DECAY, DEFAULT_MAX_INTERVAL_DAYS, DEFAULT_RETENTION, FACTOR, MAX_DIFFICULTY, MIN_DIFFICULTY,
    MIN_STABILITY, MS_PER_DAY,
};
use crate::error::CoreError;
use crate::rating::Rating;
use crate::weights::Weights;

/// Tunable parameters, persisted by the config store.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerParams {
    pub weights: Weights,
    pub request_retention: f64,
    pub max_interval_days: u32,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            request_retention: DEFAULT_RETENTION,
            max_interval_days: DEFAULT_MAX_INTERVAL_DAYS,
        }
    }
}

impl SchedulerParams {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.request_retention > 0.0 && self.request_retention < 1.0) {
            return Err(CoreError::InvalidParameter(format!(
                "requestRetention must be in (0, 1), got {}",
                self.request_retention
            )));
        }
        if self.max_interval_days == 0 {
            return Err(CoreError::InvalidParameter(
                "maxIntervalDays must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of scheduling one rating.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduleOutcome {
    /// The record as it should be persisted. `version` is carried over unchanged;
    /// the store bumps it on commit.
    pub card: CardRecord,
    pub interval_days: u32,
    /// Recall probability at review time (1.0 for new cards).
    pub retrievability: f64,
}

/// Interval each rating would produce, for display next to the rating actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatingPreview {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl RatingPreview {
    pub fn get(&self, rating: Rating) -> u32 {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }
}

/// Scheduler bound to one parameter set. Rebuild it when parameters change.
#[derive(Clone, Debug, PartialEq)]
pub struct Scheduler {
    params: SchedulerParams,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerParams::default())
    }
}

impl Scheduler {
    pub fn new(params: SchedulerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    fn w(&self) -> &Weights {
        &self.params.weights
    }

    pub fn init_stability(&self, rating: Rating) -> f64 {
        self.w().initial_stability(rating).max(MIN_STABILITY)
    }

    pub fn init_difficulty(&self, rating: Rating) -> f64 {
        let w = self.w();
        let d = w.init_difficulty_base() - (w.init_difficulty_slope() * (rating.value() - 1.0)).exp()
            + 1.0;
        clamp_difficulty(d)
    }

    /// Shift by the rating's distance from Good, then mean-revert toward D0(Easy).
    pub fn next_difficulty(&self, difficulty: f64, rating: Rating) -> f64 {
        let w = self.w();
        let shifted = difficulty - w.difficulty_step() * (rating.value() - 2.0);
        let reverted = w.mean_reversion() * self.init_difficulty(Rating::Easy)
            + (1.0 - w.mean_reversion()) * shifted;
        clamp_difficulty(reverted)
    }

    pub fn next_stability_success(
        &self,
        difficulty: f64,
        stability: f64,
        retrievability: f64,
        rating: Rating,
    ) -> f64 {
        let w = self.w();
        let hard_penalty = if rating == Rating::Hard {
            w.hard_penalty()
        } else {
            1.0
        };
        let easy_bonus = if rating == Rating::Easy {
            w.easy_bonus()
        } else {
            1.0
        };
        let growth = w.recall_scale().exp()
            * (11.0 - difficulty)
            * stability.powf(-w.recall_stability_decay())
            * ((w.recall_retrievability_gain() * (1.0 - retrievability)).exp() - 1.0)
            * hard_penalty
            * easy_bonus;
        (stability * (1.0 + growth)).max(MIN_STABILITY)
    }

    /// Post-lapse stability. Never exceeds the prior stability.
    pub fn next_stability_fail(&self, difficulty: f64, stability: f64, retrievability: f64) -> f64 {
        let w = self.w();
        let forgotten = w.forget_scale()
            * difficulty.powf(-w.forget_difficulty_decay())
            * ((stability + 1.0).powf(w.forget_stability_exp()) - 1.0)
            * (w.forget_retrievability_gain() * (1.0 - retrievability)).exp();
        forgotten.min(stability).max(MIN_STABILITY)
    }

    /// Whole days until recall probability drops to the target, in [1, max_interval_days].
    pub fn interval_from_stability(&self, stability: f64) -> u32 {
        let raw = stability / FACTOR * (self.params.request_retention.powf(1.0 / DECAY) - 1.0);
        let max = self.params.max_interval_days.max(1) as f64;
        if !raw.is_finite() {
            return max as u32;
        }
        raw.round().clamp(1.0, max) as u32
    }

    /// Apply one rating to `card` at time `now` (Unix ms), `elapsed_days` after
    /// its previous review.
    pub fn schedule(
        &self,
        card: &CardRecord,
        rating: Rating,
        elapsed_days: f64,
        now: i64,
    ) -> ScheduleOutcome {
        let mut next = card.clone();

        let retrievability = match card.state {
            CardState::New => {
                next.stability = self.init_stability(rating);
                next.difficulty = self.init_difficulty(rating);
                next.reps = 1;
                next.lapses = u32::from(rating.is_failure());
                1.0
            }
            CardState::Review => {
                let r = retrievability(elapsed_days, card.stability);
                next.difficulty = self.next_difficulty(card.difficulty, rating);
                next.stability = if rating.is_failure() {
                    self.next_stability_fail(next.difficulty, card.stability, r)
                } else {
                    self.next_stability_success(next.difficulty, card.stability, r, rating)
                };
                next.reps = card.reps.saturating_add(1);
                if rating.is_failure() {
                    next.lapses = card.lapses.saturating_add(1);
                }
                r
            }
        };

        // A lapse always comes back tomorrow, whatever the model says.
        let interval_days = if rating.is_failure() {
            1
        } else {
            self.interval_from_stability(next.stability)
        };

        next.state = CardState::Review;
        next.last_reviewed = now;
        next.due = now.saturating_add(interval_days as i64 * MS_PER_DAY);

        ScheduleOutcome {
            card: next,
            interval_days,
            retrievability,
        }
    }

    /// Intervals for all four ratings without committing to any of them.
    pub fn preview(&self, card: &CardRecord, elapsed_days: f64, now: i64) -> RatingPreview {
        let interval = |rating| self.schedule(card, rating, elapsed_days, now).interval_days;
        RatingPreview {
            again: interval(Rating::Again),
            hard: interval(Rating::Hard),
            good: interval(Rating::Good),
            easy: interval(Rating::Easy),
        }
    }
}

/// Probability of recall `elapsed_days` after a review, for a memory of `stability`.
pub fn retrievability(elapsed_days: f64, stability: f64) -> f64 {
    if elapsed_days <= 0.0 || stability <= 0.0 {
        return 1.0;
    }
    (1.0 + FACTOR * elapsed_days / stability).powf(DECAY)
}

fn clamp_difficulty(d: f64) -> f64 {
    d.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Compact human label for an interval: `now`, `1d`, `2w`, `3mo`, `1y`.
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{days}d"),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
