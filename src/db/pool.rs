//! Connection pool management.
//!
//! One pool per logical database key, opened lazily on first use and shared by
//! every context built for that key.

use crate::config::DatabaseConfig;
use crate::db::driver::{DataDriver, NativePool};
use crate::error::DbResult;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Process-wide cache of opened pools keyed by `key_name`.
///
/// Lookups take a read lock; opens are serialized by an async mutex so that
/// concurrent first uses of a key open exactly one pool.
#[derive(Default)]
pub struct PoolCache {
    pools: RwLock<HashMap<String, Arc<dyn NativePool>>>,
    opening: Mutex<()>,
}

impl PoolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached pool for `config.key_name`, opening it with `driver`
    /// on first use. Failed opens are not cached; the next call retries.
    pub async fn open_or_get(
        &self,
        config: &DatabaseConfig,
        driver: &dyn DataDriver,
    ) -> DbResult<Arc<dyn NativePool>> {
        if let Some(pool) = self.get(&config.key_name) {
            return Ok(pool);
        }

        let _guard = self.opening.lock().await;

        // Re-check after acquiring the open lock to prevent a duplicate open
        if let Some(pool) = self.get(&config.key_name) {
            debug!(database = %config.database_name, "Pool opened by concurrent caller");
            return Ok(pool);
        }

        let settings = config.pool_settings();
        let pool = driver.open(&config.connection_string, &settings).await?;

        info!(
            database = %config.database_name,
            data_type = %config.data_type,
            max_open = ?settings.max_open,
            max_idle = ?settings.max_idle,
            min_idle = settings.min_idle,
            "Opened connection pool"
        );

        let mut pools = match self.pools.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pools.insert(config.key_name.clone(), Arc::clone(&pool));
        Ok(pool)
    }

    /// Get an already opened pool.
    pub fn get(&self, key_name: &str) -> Option<Arc<dyn NativePool>> {
        let pools = match self.pools.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pools.get(key_name).cloned()
    }

    pub fn contains(&self, key_name: &str) -> bool {
        self.get(key_name).is_some()
    }

    /// Get the number of opened pools.
    pub fn len(&self) -> usize {
        match self.pools.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close all pools and clear the cache.
    pub async fn close_all(&self) {
        let drained: Vec<(String, Arc<dyn NativePool>)> = {
            let mut pools = match self.pools.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            pools.drain().collect()
        }; // Lock released here

        for (key, pool) in drained {
            debug!(key_len = key.len(), "Closing connection pool");
            pool.close().await;
        }
        info!("All connection pools closed");
    }
}

impl std::fmt::Debug for PoolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolCache")
            .field("pools", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlx_driver::SqliteDriver;

    fn memory_config(key: &str) -> DatabaseConfig {
        DatabaseConfig::parse(key, "DataType=sqlite,ConnectionString=sqlite::memory:").unwrap()
    }

    #[tokio::test]
    async fn test_open_or_get_reuses_pool() {
        let cache = PoolCache::new();
        let config = memory_config("a");
        let first = cache.open_or_get(&config, &SqliteDriver).await.unwrap();
        let second = cache.open_or_get(&config, &SqliteDriver).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.open_or_get(&memory_config("b"), &SqliteDriver).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.close_all().await;
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_failed_open_not_cached() {
        let cache = PoolCache::new();
        let config = DatabaseConfig::parse(
            "bad",
            "DataType=sqlite,ConnectionString=sqlite:/nonexistent-dir/x/y.db",
        )
        .unwrap();
        assert!(cache.open_or_get(&config, &SqliteDriver).await.is_err());
        assert!(!cache.contains("bad"));
    }
}
