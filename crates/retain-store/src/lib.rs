pub mod config;
pub mod config_store;
pub mod error;
pub mod schema;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod sync;

pub use config::{Config, DATA_DIR_ENV, Library, default_base_dir, resolve_data_dir};
pub use config_store::ConfigStore;
pub use error::{Result, StoreError};
pub use session::{SessionManager, SessionSummary};
pub use snapshot::{ImportReport, MetaEntry, Snapshot};
pub use store::{DeckStats, Store};
pub use sync::{SyncReport, sync_cards};
