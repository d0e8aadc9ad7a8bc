//! Whole-store JSON snapshots for backup and device transfer.
//!
//! Format: `{ "cards": [...], "meta": [{ "key", "value" }], "reviews": [...],
//! "exportedAt": "<ISO 8601>" }`. Import validates the whole document before
//! touching the database, then applies it in one transaction with
//! last-write-wins upserts.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use retain_core::{
    CardRecord, CardState, MAX_DIFFICULTY, MIN_DIFFICULTY, MIN_STABILITY, ReviewEvent,
    now_iso8601,
};

use crate::error::{Result, StoreError};
use crate::store::{Store, put_on, put_review_on, set_meta_on};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub key: String,
    pub value: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub cards: Vec<CardRecord>,
    #[serde(default)]
    pub meta: Vec<MetaEntry>,
    #[serde(default)]
    pub reviews: Vec<ReviewEvent>,
    #[serde(default)]
    pub exported_at: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub cards: usize,
    pub meta: usize,
    pub reviews: usize,
}

impl Snapshot {
    /// Reject anything that could not have been produced by `export_all`.
    pub fn validate(&self) -> Result<()> {
        for card in &self.cards {
            if card.id.is_empty() {
                return Err(StoreError::ImportFormat("card with empty id".to_string()));
            }
            let bad = |what: &str| {
                StoreError::ImportFormat(format!("card {}: {what}", card.id))
            };
            if !card.stability.is_finite() || card.stability < 0.0 {
                return Err(bad("stability must be a non-negative number"));
            }
            if !card.difficulty.is_finite() || !(0.0..=MAX_DIFFICULTY).contains(&card.difficulty)
            {
                return Err(bad("difficulty out of range"));
            }
            // Only never-reviewed cards may sit below the scheduler's floors.
            if card.state == CardState::Review {
                if card.stability < MIN_STABILITY {
                    return Err(bad("reviewed card with stability below the minimum"));
                }
                if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&card.difficulty) {
                    return Err(bad("reviewed card with difficulty out of range"));
                }
            }
        }

        let mut event_ids = HashSet::new();
        for event in &self.reviews {
            if event.card_id.is_empty() {
                return Err(StoreError::ImportFormat(
                    "review event with empty cardId".to_string(),
                ));
            }
            if !event.elapsed_days.is_finite() || event.elapsed_days < 0.0 {
                return Err(StoreError::ImportFormat(format!(
                    "review event for {}: negative elapsedDays",
                    event.card_id
                )));
            }
            if let Some(id) = event.id
                && !event_ids.insert(id)
            {
                return Err(StoreError::ImportFormat(format!(
                    "duplicate review event id {id}"
                )));
            }
        }

        if let Some(entry) = self.meta.iter().find(|m| m.key.is_empty()) {
            return Err(StoreError::ImportFormat(format!(
                "meta entry with empty key (value {})",
                entry.value
            )));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Snapshot =
            serde_json::from_str(json).map_err(|e| StoreError::ImportFormat(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

impl Store {
    pub fn export_all(&self) -> Result<Snapshot> {
        let meta = self
            .all_meta()?
            .into_iter()
            .map(|(key, value)| MetaEntry { key, value })
            .collect();
        Ok(Snapshot {
            cards: self.get_all()?,
            meta,
            reviews: self.get_all_reviews()?,
            exported_at: now_iso8601(),
        })
    }

    /// Apply a validated snapshot. Either every record lands or none does.
    pub fn import_all(&self, snapshot: &Snapshot) -> Result<ImportReport> {
        snapshot.validate()?;

        let tx = self.conn().unchecked_transaction()?;
        for card in &snapshot.cards {
            put_on(&tx, card)?;
        }
        let mut meta = 0;
        for entry in &snapshot.meta {
            // The schema version describes this database, not the snapshot.
            if entry.key == "schema_version" {
                continue;
            }
            set_meta_on(&tx, &entry.key, &entry.value)?;
            meta += 1;
        }
        for event in &snapshot.reviews {
            put_review_on(&tx, event)?;
        }
        tx.commit()?;

        let report = ImportReport {
            cards: snapshot.cards.len(),
            meta,
            reviews: snapshot.reviews.len(),
        };
        tracing::info!(
            cards = report.cards,
            meta = report.meta,
            reviews = report.reviews,
            "imported snapshot"
        );
        Ok(report)
    }

    pub fn export_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export_all()?)?)
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn import_json_str(&self, json: &str) -> Result<ImportReport> {
        let snapshot = Snapshot::from_json(json)?;
        self.import_all(&snapshot)
    }

    pub fn import_json_file(&self, path: &Path) -> Result<ImportReport> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::ImportFormat(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retain_core::{Rating, Scheduler};
    use serde_json::json;

    const NOW: i64 = 1_771_632_000_000;

    fn populated() -> Store {
        let store = Store::open_in_memory().unwrap();
        let scheduler = Scheduler::default();
        for (i, deck) in ["nouns", "verbs", "nouns"].iter().enumerate() {
            let card = CardRecord::new(format!("c{i}"), *deck);
            store.put(&card).unwrap();
            if i > 0 {
                let out = scheduler.schedule(&card, Rating::Good, 0.0, NOW);
                let event = ReviewEvent {
                    id: None,
                    card_id: card.id.clone(),
                    rating: Rating::Good,
                    elapsed_days: 0.0,
                    stability: out.card.stability,
                    difficulty: out.card.difficulty,
                    interval: out.interval_days,
                    timestamp: NOW,
                };
                store.commit_review(&out.card, &event).unwrap();
            }
        }
        store.set_meta("requestRetention", &json!(0.85)).unwrap();
        store
    }

    fn sorted_cards(store: &Store) -> Vec<CardRecord> {
        let mut cards = store.get_all().unwrap();
        cards.sort_by(|a, b| a.id.cmp(&b.id));
        cards
    }

    #[test]
    fn test_export_import_roundtrip() {
        let source = populated();
        let json = source.export_json_string().unwrap();

        let target = Store::open_in_memory().unwrap();
        let report = target.import_json_str(&json).unwrap();
        assert_eq!(report.cards, 3);
        assert_eq!(report.reviews, 2);
        assert_eq!(report.meta, 1);

        assert_eq!(sorted_cards(&target), sorted_cards(&source));
        assert_eq!(
            target.get_all_reviews().unwrap(),
            source.get_all_reviews().unwrap()
        );
        assert_eq!(target.get_meta("requestRetention").unwrap(), Some(json!(0.85)));
    }

    #[test]
    fn test_export_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&populated().export_json_string().unwrap()).unwrap();
        assert!(value["cards"].is_array());
        assert!(value["reviews"].is_array());
        assert!(value["meta"][0]["key"].is_string());
        assert!(value["exportedAt"].as_str().unwrap().ends_with('Z'));
        assert!(value["cards"][0]["lastReviewed"].is_number());
    }

    #[test]
    fn test_import_is_last_write_wins() {
        let store = populated();
        let mut snapshot = store.export_all().unwrap();
        snapshot.cards[0].reps = 99;

        store.import_all(&snapshot).unwrap();
        assert_eq!(store.get("c0").unwrap().unwrap().reps, 99);
        assert_eq!(store.get_all().unwrap().len(), 3);
        assert_eq!(store.get_all_reviews().unwrap().len(), 2);
    }

    #[test]
    fn test_malformed_json_writes_nothing() {
        let store = Store::open_in_memory().unwrap();
        let err = store.import_json_str(r#"{"cards": [{"id": "x"}]}"#).unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(_)));
        assert!(store.get_all().unwrap().is_empty());

        let err = store.import_json_str("not json").unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(_)));
    }

    #[test]
    fn test_invalid_record_aborts_whole_import() {
        let store = Store::open_in_memory().unwrap();
        let mut snapshot = populated().export_all().unwrap();
        snapshot.cards[2].difficulty = 42.0;

        let err = store.import_all(&snapshot).unwrap_err();
        assert!(matches!(err, StoreError::ImportFormat(ref msg) if msg.contains("difficulty")));
        assert!(store.get_all().unwrap().is_empty());
        assert!(store.get_all_reviews().unwrap().is_empty());
        assert!(store.all_meta().unwrap().is_empty());
    }

    #[test]
    fn test_reviewed_card_below_scheduler_floors_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let reviewed = |stability: f64, difficulty: f64| {
            json!({
                "cards": [
                    {"id": "ok", "deck": "nouns", "state": "new", "stability": 0,
                     "difficulty": 0, "due": 0, "reps": 0, "lapses": 0},
                    {"id": "r", "deck": "nouns", "state": "review", "stability": stability,
                     "difficulty": difficulty, "due": NOW, "reps": 1, "lapses": 0}
                ]
            })
            .to_string()
        };

        for (stability, difficulty) in [(0.001, 5.0), (3.0, 0.0), (0.001, 0.0), (3.0, 0.5)] {
            let err = store
                .import_json_str(&reviewed(stability, difficulty))
                .unwrap_err();
            assert!(
                matches!(err, StoreError::ImportFormat(ref msg) if msg.starts_with("card r:")),
                "S={stability} D={difficulty}: {err:?}"
            );
            assert!(store.get_all().unwrap().is_empty());
        }

        // The floors themselves are valid.
        let report = store
            .import_json_str(&reviewed(MIN_STABILITY, MIN_DIFFICULTY))
            .unwrap();
        assert_eq!(report.cards, 2);
        assert_eq!(store.get("r").unwrap().unwrap().difficulty, MIN_DIFFICULTY);
    }

    #[test]
    fn test_snapshot_without_version_defaults_to_zero() {
        let json = r#"{
            "cards": [{
                "id": "old", "deck": "nouns", "state": "new",
                "stability": 0, "difficulty": 0, "due": 0, "reps": 0, "lapses": 0
            }]
        }"#;
        let store = Store::open_in_memory().unwrap();
        store.import_json_str(json).unwrap();
        let card = store.get("old").unwrap().unwrap();
        assert_eq!(card.version, 0);
        assert_eq!(card.last_reviewed, 0);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        let source = populated();
        source.export_json_file(&path).unwrap();

        let target = Store::open_in_memory().unwrap();
        target.import_json_file(&path).unwrap();
        assert_eq!(sorted_cards(&target), sorted_cards(&source));

        let missing = dir.path().join("nope.json");
        assert!(matches!(
            target.import_json_file(&missing),
            Err(StoreError::ImportFormat(_))
        ));
    }
}
