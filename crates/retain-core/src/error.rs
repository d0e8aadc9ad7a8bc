use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// Rating outside Again/Hard/Good/Easy. Raised before any scheduling happens.
    #[error("invalid rating '{0}' (expected again, hard, good or easy)")]
    InvalidRating(String),

    /// Session command issued in a phase that does not accept it.
    #[error("cannot {command} while {phase}")]
    InvalidTransition {
        command: &'static str,
        phase: &'static str,
    },

    #[error("invalid weights: expected {expected} values, got {actual}")]
    InvalidWeights { expected: usize, actual: usize },

    #[error("invalid scheduler parameter: {0}")]
    InvalidParameter(String),
}
