use retain_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The database file could not be opened or created. Retrying may succeed.
    #[error("storage unavailable at {path}: {reason}")]
    StorageUnavailable { path: String, reason: String },

    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A snapshot failed validation; nothing was written.
    #[error("invalid snapshot: {0}")]
    ImportFormat(String),

    /// Another context committed a rating for this card first.
    #[error("card {id} was modified concurrently (expected version {expected})")]
    VersionConflict { id: String, expected: u64 },

    #[error("card not found: {0}")]
    NotFound(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
