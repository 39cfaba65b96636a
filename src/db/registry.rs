//! Data type tag to driver capability mapping.

use crate::db::driver::DataDriver;
use crate::db::sqlx_driver::{MySqlDriver, PostgresDriver, SqliteDriver};
use crate::error::{DbError, DbResult};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Registry of driver capabilities keyed by lowercased data type tag.
///
/// Injected into every context; there is no process-wide instance.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: RwLock<HashMap<String, Arc<dyn DataDriver>>>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the bundled sqlx drivers.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register("mysql", Arc::new(MySqlDriver));
        registry.register("postgres", Arc::new(PostgresDriver));
        registry.register("postgresql", Arc::new(PostgresDriver));
        registry.register("sqlite", Arc::new(SqliteDriver));
        registry
    }

    /// Register `driver` under `tag`. Re-registering replaces the previous
    /// driver.
    pub fn register(&self, tag: &str, driver: Arc<dyn DataDriver>) {
        let tag = tag.trim().to_ascii_lowercase();
        let mut drivers = match self.drivers.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if drivers.insert(tag.clone(), driver).is_some() {
            debug!(tag = %tag, "Replaced registered driver");
        } else {
            debug!(tag = %tag, "Registered driver");
        }
    }

    /// Look up the driver for `tag`.
    pub fn resolve(&self, tag: &str) -> DbResult<Arc<dyn DataDriver>> {
        let tag = tag.trim().to_ascii_lowercase();
        let drivers = match self.drivers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        drivers
            .get(&tag)
            .cloned()
            .ok_or_else(|| DbError::unknown_dialect(tag))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.resolve(tag).is_ok()
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<String> {
        let drivers = match self.drivers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut tags: Vec<String> = drivers.keys().cloned().collect();
        tags.sort();
        tags
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Dialect;

    #[test]
    fn test_defaults_registered() {
        let registry = DriverRegistry::with_defaults();
        assert_eq!(registry.tags(), vec!["mysql", "postgres", "postgresql", "sqlite"]);
        assert_eq!(registry.resolve("MySQL").unwrap().dialect(), Dialect::MySql);
    }

    #[test]
    fn test_unknown_dialect() {
        let registry = DriverRegistry::new();
        let err = registry.resolve("memdb").err().unwrap();
        assert!(matches!(err, DbError::UnknownDialect { ref tag } if tag == "memdb"));
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = DriverRegistry::new();
        registry.register("memdb", Arc::new(MySqlDriver));
        registry.register("memdb", Arc::new(SqliteDriver));
        assert_eq!(registry.resolve("memdb").unwrap().dialect(), Dialect::Sqlite);
        assert_eq!(registry.tags().len(), 1);
    }
}
