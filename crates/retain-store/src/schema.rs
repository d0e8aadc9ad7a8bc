use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 2;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    // Meta values are JSON-encoded so any serializable setting fits one column.
    // `due` and `state` indexes keep due/new queries off full scans.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            id            TEXT PRIMARY KEY,
            deck          TEXT NOT NULL,
            state         TEXT NOT NULL DEFAULT 'new',
            stability     REAL NOT NULL DEFAULT 0,
            difficulty    REAL NOT NULL DEFAULT 0,
            due           INTEGER NOT NULL DEFAULT 0,
            reps          INTEGER NOT NULL DEFAULT 0,
            lapses        INTEGER NOT NULL DEFAULT 0,
            last_reviewed INTEGER NOT NULL DEFAULT 0,
            version       INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id      TEXT NOT NULL,
            rating       TEXT NOT NULL,
            elapsed_days REAL NOT NULL,
            stability    REAL NOT NULL,
            difficulty   REAL NOT NULL,
            interval     INTEGER NOT NULL,
            timestamp    INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_cards_due ON cards(due);
        CREATE INDEX IF NOT EXISTS idx_cards_state ON cards(state);
        CREATE INDEX IF NOT EXISTS idx_cards_deck ON cards(deck);
        CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id);
        CREATE INDEX IF NOT EXISTS idx_reviews_timestamp ON reviews(timestamp);
        ",
    )?;

    // v1 databases predate optimistic versioning
    if conn.prepare("SELECT version FROM cards LIMIT 0").is_err() {
        conn.execute_batch("ALTER TABLE cards ADD COLUMN version INTEGER NOT NULL DEFAULT 0;")?;
        tracing::info!("migrated cards table: added version column");
    }

    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &["cards", "reviews", "meta"] {
            let count: i64 = conn
                .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert!(count >= 0, "table {table} should exist");
        }
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for index in &[
            "idx_cards_due",
            "idx_cards_state",
            "idx_reviews_card",
            "idx_reviews_timestamp",
        ] {
            let found: i64 = conn
                .query_row(
                    "SELECT count(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    [index],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(found, 1, "index {index} should exist");
        }
    }

    #[test]
    fn test_due_query_uses_index() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let plan: Vec<String> = conn
            .prepare("EXPLAIN QUERY PLAN SELECT id FROM cards WHERE due <= ?1")
            .unwrap()
            .query_map([0i64], |row| row.get::<_, String>(3))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert!(
            plan.iter().any(|p| p.contains("idx_cards_due")),
            "plan: {plan:?}"
        );
    }

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_idempotent_initialize() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }

    #[test]
    fn test_busy_timeout_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000, "busy_timeout should be 5000ms");
    }

    #[test]
    fn test_upgrade_v1_adds_version_column() {
        let conn = Connection::open_in_memory().unwrap();

        conn.execute_batch(
            "
            CREATE TABLE meta (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO meta (key, value) VALUES ('schema_version', '1');
            CREATE TABLE cards (
                id TEXT PRIMARY KEY, deck TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'new',
                stability REAL NOT NULL DEFAULT 0, difficulty REAL NOT NULL DEFAULT 0,
                due INTEGER NOT NULL DEFAULT 0, reps INTEGER NOT NULL DEFAULT 0,
                lapses INTEGER NOT NULL DEFAULT 0, last_reviewed INTEGER NOT NULL DEFAULT 0
            );
            INSERT INTO cards (id, deck) VALUES ('c1', 'nouns');
            ",
        )
        .unwrap();

        initialize(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT version FROM cards WHERE id = 'c1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 0);
        assert_eq!(get_schema_version(&conn).unwrap(), Some(2));
    }
}
