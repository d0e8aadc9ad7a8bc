//! Installation config and data-directory layout.
//!
//! The data directory holds the SQLite database and an optional
//! `config.toml`:
//!
//! ```toml
//! catalog = "vocabulary.json"   # relative paths resolve against the data dir
//! default_deck = "nouns"
//! db_file = "retain.db"
//! ```

use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};

use retain_core::Catalog;

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const DATA_DIR_ENV: &str = "RETAIN_DATA_DIR";
pub const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DB_FILE: &str = "retain.db";

/// `~/.retain`, or `./.retain` when no home directory is known.
pub fn default_base_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".retain")
}

/// Explicit flag, then `RETAIN_DATA_DIR`, then the default.
pub fn resolve_data_dir(flag: Option<&Path>) -> PathBuf {
    flag.map(PathBuf::from)
        .or_else(|| {
            env::var(DATA_DIR_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(default_base_dir)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub catalog: Option<PathBuf>,
    pub default_deck: Option<String>,
    pub db_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog: None,
            default_deck: None,
            db_file: DEFAULT_DB_FILE.to_string(),
        }
    }
}

impl Config {
    pub fn parse(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))?;
        if config.db_file.trim().is_empty() {
            return Err(StoreError::Config("db_file must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Read `config.toml` from `dir`. A missing file means defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text)
                .map_err(|e| StoreError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

/// An opened data directory: its config plus the store inside it.
pub struct Library {
    dir: PathBuf,
    config: Config,
    store: Store,
}

impl Library {
    /// Create the directory if needed, read the config, open the database.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| StoreError::StorageUnavailable {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Config::load(dir)?;
        let store = Store::open(&dir.join(&config.db_file))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            store,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Catalog path from `override_path` or the config, resolved against the
    /// data directory when relative.
    pub fn catalog_path(&self, override_path: Option<&Path>) -> Option<PathBuf> {
        let path = override_path.or(self.config.catalog.as_deref())?;
        Some(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        })
    }

    pub fn load_catalog(&self, override_path: Option<&Path>) -> Result<Catalog> {
        let path = self.catalog_path(override_path).ok_or_else(|| {
            StoreError::Catalog(format!(
                "no catalog configured (set `catalog` in {})",
                self.dir.join(CONFIG_FILE).display()
            ))
        })?;
        let json = fs::read_to_string(&path)
            .map_err(|e| StoreError::Catalog(format!("failed to read {}: {e}", path.display())))?;
        Catalog::from_json(&json)
            .map_err(|e| StoreError::Catalog(format!("{}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            catalog = "words.json"
            default_deck = "verbs"
            db_file = "custom.db"
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog, Some(PathBuf::from("words.json")));
        assert_eq!(config.default_deck.as_deref(), Some("verbs"));
        assert_eq!(config.db_file, "custom.db");
    }

    #[test]
    fn test_parse_empty_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        assert!(matches!(
            Config::parse("catalogue = \"x\""),
            Err(StoreError::Config(_))
        ));
        assert!(matches!(
            Config::parse("db_file = \"\""),
            Err(StoreError::Config(_))
        ));
    }

    #[test]
    fn test_explicit_flag_wins() {
        let dir = PathBuf::from("/tmp/explicit");
        assert_eq!(resolve_data_dir(Some(&dir)), dir);
    }

    #[test]
    fn test_library_open_creates_dir_and_db() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let lib = Library::open(&dir).unwrap();
        assert!(dir.join(DEFAULT_DB_FILE).exists());
        assert_eq!(lib.config(), &Config::default());
        assert!(lib.catalog_path(None).is_none());
        assert!(matches!(lib.load_catalog(None), Err(StoreError::Catalog(_))));
    }

    #[test]
    fn test_library_reads_catalog_relative_to_dir() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "catalog = \"words.json\"\ndb_file = \"words.db\"\n",
        )
        .unwrap();
        fs::write(
            tmp.path().join("words.json"),
            r#"{"items": [{"front": "kitab", "back": "book", "deck": "nouns"}]}"#,
        )
        .unwrap();

        let lib = Library::open(tmp.path()).unwrap();
        assert!(tmp.path().join("words.db").exists());
        assert_eq!(
            lib.catalog_path(None),
            Some(tmp.path().join("words.json"))
        );
        let catalog = lib.load_catalog(None).unwrap();
        assert_eq!(catalog.items.len(), 1);
    }

    #[test]
    fn test_bad_config_file_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "db_file = [").unwrap();
        assert!(matches!(Library::open(tmp.path()), Err(StoreError::Config(_))));
    }
}
