use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};

use retain_core::{CardRecord, CardState, Rating, ReviewEvent, now_unix_millis};

use crate::error::{Result, StoreError};
use crate::schema;

const CARD_COLUMNS: &str =
    "id, deck, state, stability, difficulty, due, reps, lapses, last_reviewed, version";

const REVIEW_COLUMNS: &str =
    "id, card_id, rating, elapsed_days, stability, difficulty, interval, timestamp";

/// Per-deck counts for the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckStats {
    pub deck: String,
    pub total: u64,
    pub new: u64,
    pub due: u64,
}

/// Card table, review log and meta table over one SQLite connection.
///
/// Every method is a single statement or a single transaction; there are no
/// cross-record transactions apart from bulk sync and snapshot import.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path`. SQLite opens lazily, so a file
    /// that is not a database or cannot be written only fails once the schema
    /// is touched; both cases surface as [`StoreError::StorageUnavailable`].
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| unavailable(path, e))?;
        schema::initialize(&conn).map_err(|e| unavailable(path, e))?;
        tracing::debug!("opened store at {}", path.display());
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Meta ---

    pub fn get_meta(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        match raw {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StoreError::InvalidData(format!("meta '{key}' is not JSON: {e}"))),
        }
    }

    pub fn set_meta(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        set_meta_on(&self.conn, key, value)
    }

    /// Every meta entry except the schema bookkeeping row.
    pub fn all_meta(&self) -> Result<Vec<(String, serde_json::Value)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM meta WHERE key != 'schema_version' ORDER BY key")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(key, text)| {
                let value = serde_json::from_str(&text).map_err(|e| {
                    StoreError::InvalidData(format!("meta '{key}' is not JSON: {e}"))
                })?;
                Ok((key, value))
            })
            .collect()
    }

    // --- Cards ---

    pub fn get(&self, id: &str) -> Result<Option<CardRecord>> {
        get_on(&self.conn, id)
    }

    /// Insert or overwrite a record, version included.
    pub fn put(&self, card: &CardRecord) -> Result<()> {
        put_on(&self.conn, card)
    }

    pub fn get_all(&self) -> Result<Vec<CardRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {CARD_COLUMNS} FROM cards ORDER BY rowid"))?;
        let cards = stmt
            .query_map([], read_card)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(cards)
    }

    /// Returns whether a record was removed.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM cards WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    /// Every card with `due <= now`, optionally limited to one deck. Unordered.
    pub fn get_due_cards(&self, deck: Option<&str>, now: i64) -> Result<Vec<CardRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM cards WHERE due <= ?1 AND (?2 IS NULL OR deck = ?2)"
        ))?;
        let cards = stmt
            .query_map(params![now, deck], read_card)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(cards)
    }

    pub fn count_due(&self, deck: Option<&str>, now: i64) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE due <= ?1 AND (?2 IS NULL OR deck = ?2)",
            params![now, deck],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn count_new(&self, deck: Option<&str>) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cards WHERE state = 'new' AND (?1 IS NULL OR deck = ?1)",
            params![deck],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    pub fn deck_stats(&self, now: i64) -> Result<Vec<DeckStats>> {
        let mut stmt = self.conn.prepare(
            "SELECT deck, COUNT(*),
                    SUM(CASE WHEN state = 'new' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN due <= ?1 THEN 1 ELSE 0 END)
             FROM cards GROUP BY deck ORDER BY deck",
        )?;
        let stats = stmt
            .query_map([now], |row| {
                Ok(DeckStats {
                    deck: row.get(0)?,
                    total: row.get::<_, i64>(1)? as u64,
                    new: row.get::<_, i64>(2)? as u64,
                    due: row.get::<_, i64>(3)? as u64,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(stats)
    }

    /// Persist a scheduled card and its review event atomically.
    ///
    /// `card.version` must equal the stored version; on success the stored
    /// version is bumped and the committed record (with the new version) and
    /// the event id are returned. A mismatch means another context rated the
    /// card first and nothing is written.
    pub fn commit_review(
        &self,
        card: &CardRecord,
        event: &ReviewEvent,
    ) -> Result<(CardRecord, i64)> {
        let tx = self.conn.unchecked_transaction()?;

        let rows = tx.execute(
            "UPDATE cards SET deck = ?2, state = ?3, stability = ?4, difficulty = ?5,
                    due = ?6, reps = ?7, lapses = ?8, last_reviewed = ?9, version = version + 1
             WHERE id = ?1 AND version = ?10",
            params![
                card.id,
                card.deck,
                card.state.as_str(),
                card.stability,
                card.difficulty,
                card.due,
                card.reps,
                card.lapses,
                card.last_reviewed,
                card.version as i64,
            ],
        )?;

        if rows == 0 {
            return Err(match get_on(&tx, &card.id)? {
                None => StoreError::NotFound(card.id.clone()),
                Some(_) => StoreError::VersionConflict {
                    id: card.id.clone(),
                    expected: card.version,
                },
            });
        }

        let event_id = log_review_on(&tx, event)?;
        tx.commit()?;

        let mut committed = card.clone();
        committed.version += 1;
        tracing::debug!(
            card = %committed.id,
            rating = %event.rating,
            interval = event.interval,
            version = committed.version,
            "committed review"
        );
        Ok((committed, event_id))
    }

    // --- Review log ---

    /// Append an event. Returns its id. A zero timestamp is stamped with now.
    pub fn log_review(&self, event: &ReviewEvent) -> Result<i64> {
        log_review_on(&self.conn, event)
    }

    pub fn get_review_history(&self, card_id: &str) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE card_id = ?1 ORDER BY id"
        ))?;
        let events = stmt
            .query_map([card_id], read_review)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(events)
    }

    pub fn get_all_reviews(&self) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY id"))?;
        let events = stmt
            .query_map([], read_review)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(events)
    }

    /// Events logged in `[from, to)`, oldest first.
    pub fn get_reviews_between(&self, from: i64, to: i64) -> Result<Vec<ReviewEvent>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE timestamp >= ?1 AND timestamp < ?2
             ORDER BY timestamp, id"
        ))?;
        let events = stmt
            .query_map([from, to], read_review)?
            .collect::<std::result::Result<_, _>>()?;
        Ok(events)
    }
}

// --- Connection-level helpers, shared with transactions ---

pub(crate) fn get_on(conn: &Connection, id: &str) -> Result<Option<CardRecord>> {
    let card = conn
        .query_row(
            &format!("SELECT {CARD_COLUMNS} FROM cards WHERE id = ?1"),
            [id],
            read_card,
        )
        .optional()?;
    Ok(card)
}

fn unavailable(path: &Path, reason: impl std::fmt::Display) -> StoreError {
    StoreError::StorageUnavailable {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

pub(crate) fn put_on(conn: &Connection, card: &CardRecord) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO cards ({CARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                deck = excluded.deck, state = excluded.state,
                stability = excluded.stability, difficulty = excluded.difficulty,
                due = excluded.due, reps = excluded.reps, lapses = excluded.lapses,
                last_reviewed = excluded.last_reviewed, version = excluded.version"
        ),
        params![
            card.id,
            card.deck,
            card.state.as_str(),
            card.stability,
            card.difficulty,
            card.due,
            card.reps,
            card.lapses,
            card.last_reviewed,
            card.version as i64,
        ],
    )?;
    Ok(())
}

/// Insert only if the id is unseen. Returns whether a row was created.
pub(crate) fn insert_if_absent_on(conn: &Connection, card: &CardRecord) -> Result<bool> {
    let rows = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO cards ({CARD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
        ),
        params![
            card.id,
            card.deck,
            card.state.as_str(),
            card.stability,
            card.difficulty,
            card.due,
            card.reps,
            card.lapses,
            card.last_reviewed,
            card.version as i64,
        ],
    )?;
    Ok(rows > 0)
}

pub(crate) fn set_meta_on(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
        params![key, serde_json::to_string(value)?],
    )?;
    Ok(())
}

pub(crate) fn log_review_on(conn: &Connection, event: &ReviewEvent) -> Result<i64> {
    let timestamp = if event.timestamp > 0 {
        event.timestamp
    } else {
        now_unix_millis()
    };
    conn.execute(
        "INSERT INTO reviews (card_id, rating, elapsed_days, stability, difficulty, interval, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.card_id,
            event.rating.as_str(),
            event.elapsed_days.max(0.0),
            event.stability,
            event.difficulty,
            event.interval,
            timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Upsert a review event keeping its id (snapshot import).
pub(crate) fn put_review_on(conn: &Connection, event: &ReviewEvent) -> Result<()> {
    match event.id {
        Some(id) => {
            conn.execute(
                &format!(
                    "INSERT OR REPLACE INTO reviews ({REVIEW_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    id,
                    event.card_id,
                    event.rating.as_str(),
                    event.elapsed_days,
                    event.stability,
                    event.difficulty,
                    event.interval,
                    event.timestamp,
                ],
            )?;
        }
        None => {
            log_review_on(conn, event)?;
        }
    }
    Ok(())
}

fn read_card(row: &Row<'_>) -> rusqlite::Result<CardRecord> {
    let state: String = row.get(2)?;
    let state = CardState::parse(&state).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown card state '{state}'").into(),
        )
    })?;
    Ok(CardRecord {
        id: row.get(0)?,
        deck: row.get(1)?,
        state,
        stability: row.get(3)?,
        difficulty: row.get(4)?,
        due: row.get(5)?,
        reps: row.get(6)?,
        lapses: row.get(7)?,
        last_reviewed: row.get(8)?,
        version: row.get::<_, i64>(9)? as u64,
    })
}

fn read_review(row: &Row<'_>) -> rusqlite::Result<ReviewEvent> {
    let rating: String = row.get(2)?;
    let rating: Rating = rating.parse().map_err(|e: retain_core::CoreError| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.to_string().into())
    })?;
    Ok(ReviewEvent {
        id: Some(row.get(0)?),
        card_id: row.get(1)?,
        rating,
        elapsed_days: row.get(3)?,
        stability: row.get(4)?,
        difficulty: row.get(5)?,
        interval: row.get(6)?,
        timestamp: row.get(7)?,
    })
}
