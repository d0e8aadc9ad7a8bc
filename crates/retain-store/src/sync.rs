//! Reconcile an external content catalog into scheduler records.

use std::collections::HashSet;

use retain_core::{CardRecord, ContentCatalog};

use crate::error::{Result, StoreError};
use crate::store::{Store, insert_if_absent_on};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items read from the catalog, duplicates included.
    pub total: usize,
    pub created: usize,
    /// Items whose id already had a record, or repeated an earlier item.
    pub existing: usize,
}

/// Create a `New` record, due immediately, for every catalog item whose id the
/// store has not seen. Existing records are never touched, so running this
/// twice creates nothing the second time. All inserts share one transaction.
pub fn sync_cards<C: ContentCatalog>(store: &Store, catalog: &C) -> Result<SyncReport> {
    let items = catalog
        .items()
        .map_err(|e| StoreError::Catalog(e.to_string()))?;

    let tx = store.conn().unchecked_transaction()?;
    let mut seen = HashSet::with_capacity(items.len());
    let mut report = SyncReport {
        total: items.len(),
        ..SyncReport::default()
    };

    for item in &items {
        let id = item.card_id();
        if !seen.insert(id.clone()) {
            tracing::debug!(card = %id, front = %item.front, "duplicate catalog item collapsed");
            report.existing += 1;
            continue;
        }
        if insert_if_absent_on(&tx, &CardRecord::new(id, item.deck.clone()))? {
            report.created += 1;
        } else {
            report.existing += 1;
        }
    }

    tx.commit()?;
    tracing::info!(
        total = report.total,
        created = report.created,
        existing = report.existing,
        "catalog sync complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use retain_core::{Catalog, CatalogItem, DeckInfo, card_id};

    fn item(front: &str, back: &str, deck: &str) -> CatalogItem {
        CatalogItem {
            front: front.to_string(),
            back: back.to_string(),
            front_lang: "ar".to_string(),
            back_lang: "en".to_string(),
            deck: deck.to_string(),
            note: None,
            example: None,
        }
    }

    fn catalog(items: Vec<CatalogItem>) -> Catalog {
        Catalog {
            items,
            ..Catalog::default()
        }
    }

    #[test]
    fn test_sync_creates_new_records_due_now() {
        let store = Store::open_in_memory().unwrap();
        let cat = catalog(vec![item("kitab", "book", "nouns"), item("qalam", "pen", "nouns")]);

        let report = sync_cards(&store, &cat).unwrap();
        assert_eq!(
            report,
            SyncReport {
                total: 2,
                created: 2,
                existing: 0
            }
        );

        let record = store.get(&card_id("kitab", "book", "nouns")).unwrap().unwrap();
        assert!(record.is_new());
        assert_eq!(record.due, 0);
        assert_eq!(record.deck, "nouns");
        assert_eq!(store.count_due(None, 1).unwrap(), 2);
    }

    #[test]
    fn test_second_sync_creates_nothing() {
        let store = Store::open_in_memory().unwrap();
        let cat = catalog(vec![item("kitab", "book", "nouns"), item("dhahaba", "went", "verbs")]);

        sync_cards(&store, &cat).unwrap();
        let report = sync_cards(&store, &cat).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.existing, 2);
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_duplicates_collapse() {
        let store = Store::open_in_memory().unwrap();
        let cat = catalog(vec![
            item("kitab", "book", "nouns"),
            item("kitab", "book", "nouns"),
            item("qalam", "pen", "nouns"),
        ]);

        let report = sync_cards(&store, &cat).unwrap();
        assert_eq!(report.total, 3);
        assert_eq!(report.created, 2);
        assert_eq!(report.existing, 1);
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_existing_progress_untouched() {
        let store = Store::open_in_memory().unwrap();
        let cat = catalog(vec![item("kitab", "book", "nouns")]);
        sync_cards(&store, &cat).unwrap();

        let id = card_id("kitab", "book", "nouns");
        let mut record = store.get(&id).unwrap().unwrap();
        record.reps = 5;
        record.due = 42;
        store.put(&record).unwrap();

        sync_cards(&store, &cat).unwrap();
        assert_eq!(store.get(&id).unwrap().unwrap(), record);
    }

    #[test]
    fn test_moving_deck_yields_new_identity() {
        let store = Store::open_in_memory().unwrap();
        sync_cards(&store, &catalog(vec![item("kitab", "book", "nouns")])).unwrap();
        let report = sync_cards(&store, &catalog(vec![item("kitab", "book", "books")])).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(store.get_all().unwrap().len(), 2);
    }

    struct FailingCatalog;

    #[derive(Debug, thiserror::Error)]
    #[error("catalog offline")]
    struct Offline;

    impl ContentCatalog for FailingCatalog {
        type Error = Offline;

        fn items(&self) -> std::result::Result<Vec<CatalogItem>, Offline> {
            Err(Offline)
        }

        fn deck_info(&self, _deck: &str) -> Option<DeckInfo> {
            None
        }
    }

    #[test]
    fn test_catalog_failure_surfaces() {
        let store = Store::open_in_memory().unwrap();
        let err = sync_cards(&store, &FailingCatalog).unwrap_err();
        assert!(matches!(err, StoreError::Catalog(ref msg) if msg == "catalog offline"));
        assert!(store.get_all().unwrap().is_empty());
    }
}
