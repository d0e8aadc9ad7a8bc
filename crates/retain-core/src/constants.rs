/// Forgetting-curve exponent: R(t) = (1 + FACTOR·t/S)^DECAY
pub const DECAY: f64 = -0.5;

/// Chosen so that R(S, S) = 0.9: 0.9^(1/DECAY) - 1 = 19/81
pub const FACTOR: f64 = 19.0 / 81.0;

/// Stability floor. Every computed stability is at least this.
pub const MIN_STABILITY: f64 = 0.01;

/// Difficulty bounds (inclusive)
pub const MIN_DIFFICULTY: f64 = 1.0;
pub const MAX_DIFFICULTY: f64 = 10.0;

/// Default target probability of recall at the scheduled due time
pub const DEFAULT_RETENTION: f64 = 0.9;

/// Default interval cap (~10 years)
pub const DEFAULT_MAX_INTERVAL_DAYS: u32 = 3650;

/// Milliseconds per day, the unit conversion for `due` and `last_reviewed`.
pub const MS_PER_DAY: i64 = 86_400_000;
