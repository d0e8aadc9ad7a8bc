//! Externally-owned vocabulary content.
//!
//! The scheduler never edits the catalog; it only reads items to derive card
//! identities. Deck metadata is display-only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::card::card_id;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub front_lang: String,
    #[serde(default)]
    pub back_lang: String,
    pub deck: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl CatalogItem {
    pub fn card_id(&self) -> String {
        card_id(&self.front, &self.back, &self.deck)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckInfo {
    pub name: String,
    #[serde(default)]
    pub icon: String,
}

/// Read side of the content catalog.
pub trait ContentCatalog {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Every item, in catalog order.
    fn items(&self) -> Result<Vec<CatalogItem>, Self::Error>;

    /// Display metadata for a deck key, if the catalog has any.
    fn deck_info(&self, deck: &str) -> Option<DeckInfo>;

    /// Display name for a deck key, falling back to the key itself.
    fn deck_name(&self, deck: &str) -> String {
        self.deck_info(deck)
            .map(|d| d.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| deck.to_string())
    }
}

/// A fully loaded catalog, as stored in a JSON document:
/// `{ "decks": { "<id>": { "name", "icon" } }, "items": [ ... ] }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub decks: BTreeMap<String, DeckInfo>,
    #[serde(default)]
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Look up the catalog item behind a card id. Linear scan; catalogs are small.
    pub fn find(&self, card_id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|item| item.card_id() == card_id)
    }
}

impl ContentCatalog for Catalog {
    type Error = std::convert::Infallible;

    fn items(&self) -> Result<Vec<CatalogItem>, Self::Error> {
        Ok(self.items.clone())
    }

    fn deck_info(&self, deck: &str) -> Option<DeckInfo> {
        self.decks.get(deck).cloned()
    }
}
