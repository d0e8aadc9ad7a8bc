//! Spaced-repetition scheduling engine.
//!
//! Models each learned item with an FSRS-style memory state (stability,
//! difficulty) and decides when it should be shown again so that recall
//! probability at the due time matches a target retention.
//!
//! Zero I/O: pure math and in-memory session state, no opinions about
//! persistence or presentation.

pub mod card;
pub mod catalog;
pub mod constants;
pub mod error;
pub mod rating;
pub mod scheduler;
pub mod session;
pub mod time;
pub mod weights;

pub use card::{CardRecord, CardState, ReviewEvent, card_id};
pub use catalog::{Catalog, CatalogItem, ContentCatalog, DeckInfo};
pub use constants::{
    DECAY, DEFAULT_MAX_INTERVAL_DAYS, DEFAULT_RETENTION, FACTOR, MAX_DIFFICULTY, MIN_DIFFICULTY,
    MIN_STABILITY, MS_PER_DAY,
};
pub use error::CoreError;
pub use rating::Rating;
pub use scheduler::{
    RatingPreview, ScheduleOutcome, Scheduler, SchedulerParams, format_interval, retrievability,
};
pub use session::{Phase, ReviewSession, SessionTally, order_queue};
pub use time::{elapsed_days, now_iso8601, now_unix_millis, unix_millis_to_iso8601};
pub use weights::{DEFAULT_WEIGHTS, WEIGHT_COUNT, Weights};
