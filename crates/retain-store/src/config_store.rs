//! Scheduler parameters persisted in the meta table.
//!
//! Keys: `weights` (array of 19 numbers), `requestRetention` (number in
//! (0, 1)), `maxIntervalDays` (positive integer). Absent keys are seeded with
//! defaults on first access. A stored value that cannot be used is replaced by
//! its default for this load and a warning is logged; the stored value itself
//! is left alone so a later `save` can fix it.

use retain_core::{
    DEFAULT_MAX_INTERVAL_DAYS, DEFAULT_RETENTION, Scheduler, SchedulerParams, Weights,
};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::store::Store;

pub const WEIGHTS_KEY: &str = "weights";
pub const RETENTION_KEY: &str = "requestRetention";
pub const MAX_INTERVAL_KEY: &str = "maxIntervalDays";

pub struct ConfigStore<'a> {
    store: &'a Store,
}

impl<'a> ConfigStore<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Write defaults for any parameter key not yet present. Returns how many
    /// keys were seeded.
    pub fn seed_defaults(&self) -> Result<usize> {
        let defaults = SchedulerParams::default();
        let mut seeded = 0;
        for (key, value) in params_to_meta(&defaults) {
            let present: i64 = self.store.conn().query_row(
                "SELECT COUNT(*) FROM meta WHERE key = ?1",
                [key],
                |row| row.get(0),
            )?;
            if present == 0 {
                self.store.set_meta(key, &value)?;
                seeded += 1;
            }
        }
        if seeded > 0 {
            tracing::info!(seeded, "seeded default scheduler parameters");
        }
        Ok(seeded)
    }

    /// Current parameters, seeding and recovering as described above.
    pub fn load_params(&self) -> Result<SchedulerParams> {
        self.seed_defaults()?;
        let defaults = SchedulerParams::default();

        let weights = match self.read(WEIGHTS_KEY)? {
            Some(value) => parse_weights(&value).unwrap_or_else(|reason| {
                tracing::warn!("corrupt config '{WEIGHTS_KEY}' ({reason}), using defaults");
                defaults.weights
            }),
            None => defaults.weights,
        };

        let request_retention = match self.read(RETENTION_KEY)? {
            Some(value) => match value.as_f64() {
                Some(r) if r > 0.0 && r < 1.0 => r,
                _ => {
                    tracing::warn!(
                        "corrupt config '{RETENTION_KEY}' ({value}), using {DEFAULT_RETENTION}"
                    );
                    DEFAULT_RETENTION
                }
            },
            None => DEFAULT_RETENTION,
        };

        let max_interval_days = match self.read(MAX_INTERVAL_KEY)? {
            Some(value) => match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
                Some(n) if n > 0 => n,
                _ => {
                    tracing::warn!(
                        "corrupt config '{MAX_INTERVAL_KEY}' ({value}), using {DEFAULT_MAX_INTERVAL_DAYS}"
                    );
                    DEFAULT_MAX_INTERVAL_DAYS
                }
            },
            None => DEFAULT_MAX_INTERVAL_DAYS,
        };

        Ok(SchedulerParams {
            weights,
            request_retention,
            max_interval_days,
        })
    }

    pub fn scheduler(&self) -> Result<Scheduler> {
        Ok(Scheduler::new(self.load_params()?))
    }

    /// Validate and persist `params`, returning a scheduler bound to them.
    /// Invalid parameters are rejected without writing anything.
    pub fn save(&self, params: SchedulerParams) -> Result<Scheduler> {
        params.validate()?;
        let tx = self.store.conn().unchecked_transaction()?;
        for (key, value) in params_to_meta(&params) {
            crate::store::set_meta_on(&tx, key, &value)?;
        }
        tx.commit()?;
        tracing::info!(
            retention = params.request_retention,
            max_interval_days = params.max_interval_days,
            "saved scheduler parameters"
        );
        Ok(Scheduler::new(params))
    }

    /// Read a key, treating text that is not JSON as corrupt. Storage errors
    /// are returned.
    fn read(&self, key: &str) -> Result<Option<Value>> {
        match self.store.get_meta(key) {
            Err(StoreError::InvalidData(reason)) => {
                tracing::warn!("corrupt config '{key}': {reason}");
                Ok(Some(Value::Null))
            }
            other => other,
        }
    }
}

fn params_to_meta(params: &SchedulerParams) -> [(&'static str, Value); 3] {
    [
        (WEIGHTS_KEY, Value::from(params.weights.as_slice().to_vec())),
        (RETENTION_KEY, Value::from(params.request_retention)),
        (MAX_INTERVAL_KEY, Value::from(params.max_interval_days)),
    ]
}

fn parse_weights(value: &Value) -> std::result::Result<Weights, String> {
    let values: Vec<f64> = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    Weights::try_from(values).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use retain_core::{CoreError, DEFAULT_WEIGHTS};
    use serde_json::json;

    #[test]
    fn test_first_access_seeds_defaults() {
        let store = Store::open_in_memory().unwrap();
        let config = ConfigStore::new(&store);

        assert_eq!(config.load_params().unwrap(), SchedulerParams::default());
        assert_eq!(store.get_meta(RETENTION_KEY).unwrap(), Some(json!(0.9)));
        assert_eq!(store.get_meta(MAX_INTERVAL_KEY).unwrap(), Some(json!(3650)));
        let weights = store.get_meta(WEIGHTS_KEY).unwrap().unwrap();
        assert_eq!(weights.as_array().unwrap().len(), DEFAULT_WEIGHTS.len());

        // Seeding happens once.
        assert_eq!(config.seed_defaults().unwrap(), 0);
    }

    #[test]
    fn test_existing_values_not_overwritten_by_seed() {
        let store = Store::open_in_memory().unwrap();
        store.set_meta(RETENTION_KEY, &json!(0.85)).unwrap();

        let params = ConfigStore::new(&store).load_params().unwrap();
        assert_relative_eq!(params.request_retention, 0.85);
        assert_eq!(params.max_interval_days, DEFAULT_MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_wrong_length_weights_fall_back_to_defaults() {
        let store = Store::open_in_memory().unwrap();
        store.set_meta(WEIGHTS_KEY, &json!([1.0, 2.0, 3.0])).unwrap();

        let params = ConfigStore::new(&store).load_params().unwrap();
        assert_eq!(params.weights, Weights::default());
        // The bad value stays in place until explicitly saved over.
        assert_eq!(store.get_meta(WEIGHTS_KEY).unwrap(), Some(json!([1.0, 2.0, 3.0])));
    }

    #[test]
    fn test_unparsable_values_fall_back_to_defaults() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO meta (key, value) VALUES ('weights', '{{{')",
                [],
            )
            .unwrap();
        store.set_meta(RETENTION_KEY, &json!(1.5)).unwrap();
        store.set_meta(MAX_INTERVAL_KEY, &json!("forever")).unwrap();

        let params = ConfigStore::new(&store).load_params().unwrap();
        assert_eq!(params, SchedulerParams::default());
    }

    #[test]
    fn test_storage_errors_are_not_treated_as_corrupt_config() {
        let store = Store::open_in_memory().unwrap();
        // Present, so seeding skips it, but not readable as text.
        store
            .conn()
            .execute(
                "INSERT INTO meta (key, value) VALUES ('weights', X'00FF')",
                [],
            )
            .unwrap();

        let err = ConfigStore::new(&store).load_params().unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)), "{err:?}");

        store.conn().execute_batch("DROP TABLE meta").unwrap();
        let config = ConfigStore::new(&store);
        assert!(matches!(config.read(RETENTION_KEY), Err(StoreError::Sqlite(_))));
        assert!(matches!(config.load_params(), Err(StoreError::Sqlite(_))));
    }

    #[test]
    fn test_save_rebinds_scheduler() {
        let store = Store::open_in_memory().unwrap();
        let config = ConfigStore::new(&store);
        let params = SchedulerParams {
            request_retention: 0.8,
            max_interval_days: 100,
            ..SchedulerParams::default()
        };

        let scheduler = config.save(params).unwrap();
        assert_eq!(scheduler.params(), &params);
        assert_eq!(config.load_params().unwrap(), params);
        assert!(scheduler.interval_from_stability(1_000.0) <= 100);
    }

    #[test]
    fn test_save_rejects_invalid_params() {
        let store = Store::open_in_memory().unwrap();
        let config = ConfigStore::new(&store);
        let bad = SchedulerParams {
            request_retention: 1.0,
            ..SchedulerParams::default()
        };

        let err = config.save(bad).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::InvalidParameter(_))
        ));
        assert!(store.get_meta(RETENTION_KEY).unwrap().is_none());
    }
}
