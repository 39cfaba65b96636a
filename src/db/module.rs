//! Process-level wiring of registry, pool cache, contexts and repositories.

use crate::config::{Config, DatabaseConfig};
use crate::db::context::DbContext;
use crate::db::health::{ConnectionChecker, HealthCheck};
use crate::db::pool::PoolCache;
use crate::db::registry::DriverRegistry;
use crate::error::{DbError, DbResult};
use crate::repository::Repositories;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Owns everything a host needs to reach its configured databases.
///
/// Contexts registered here share one [`PoolCache`], so two keys never
/// share a pool and one key never opens two.
pub struct DataModule {
    registry: Arc<DriverRegistry>,
    pools: Arc<PoolCache>,
    contexts: RwLock<BTreeMap<String, DbContext>>,
    repositories: Repositories,
}

impl DataModule {
    /// Module with the bundled sqlx drivers.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(DriverRegistry::with_defaults()))
    }

    pub fn with_registry(registry: Arc<DriverRegistry>) -> Self {
        Self {
            registry,
            pools: Arc::new(PoolCache::new()),
            contexts: RwLock::new(BTreeMap::new()),
            repositories: Repositories::new(),
        }
    }

    /// Module with every `--database` entry of `config` registered.
    pub fn from_config(config: &Config) -> DbResult<Self> {
        let module = Self::new();
        for (key, config_string) in config.parse_databases()? {
            module.register(&key, &config_string)?;
        }
        Ok(module)
    }

    pub fn registry(&self) -> &Arc<DriverRegistry> {
        &self.registry
    }

    pub fn pools(&self) -> &Arc<PoolCache> {
        &self.pools
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// Checker sharing this module's driver registry.
    pub fn connection_checker(&self) -> ConnectionChecker {
        ConnectionChecker::new(Arc::clone(&self.registry))
    }

    /// Parse `config_string` and register a context under `key`.
    ///
    /// Configuration and dialect errors surface here, before any
    /// connection is attempted. Registering a key twice replaces the
    /// context but keeps an already opened pool.
    pub fn register(&self, key: &str, config_string: &str) -> DbResult<DbContext> {
        let key = key.trim();
        if key.is_empty() {
            return Err(DbError::configuration("Database key cannot be empty"));
        }
        let config = DatabaseConfig::parse(key, config_string)?;
        let context = DbContext::new(config, &self.registry, Arc::clone(&self.pools))?;

        let mut contexts = match self.contexts.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if contexts.insert(key.to_string(), context.clone()).is_some() {
            warn!(key = %key, "Replaced registered database context");
        }
        info!(
            key = %key,
            database = %context.database_name(),
            dialect = context.dialect().name(),
            "Registered database context"
        );
        Ok(context)
    }

    pub fn context(&self, key: &str) -> Option<DbContext> {
        let contexts = match self.contexts.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        contexts.get(key).cloned()
    }

    /// Registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let contexts = match self.contexts.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        contexts.keys().cloned().collect()
    }

    /// One health probe per registered context, in key order.
    pub fn health_checks(&self) -> Vec<HealthCheck> {
        let contexts = match self.contexts.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        contexts
            .iter()
            .map(|(key, context)| HealthCheck::new(key.clone(), context.clone()))
            .collect()
    }

    /// Close every pool opened through this module.
    pub async fn shutdown(&self) {
        self.pools.close_all().await;
    }
}

impl Default for DataModule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DataModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataModule")
            .field("registry", &self.registry)
            .field("pools", &self.pools)
            .field("contexts", &self.keys())
            .field("repositories", &self.repositories)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMORY: &str = "DataType=sqlite,ConnectionString=sqlite::memory:";

    #[test]
    fn test_register_and_lookup() {
        let module = DataModule::new();
        module.register("b", MEMORY).unwrap();
        module.register("a", MEMORY).unwrap();
        assert_eq!(module.keys(), vec!["a", "b"]);
        assert_eq!(module.context("a").unwrap().key_name(), "a");
        assert!(module.context("missing").is_none());

        let names: Vec<String> = module
            .health_checks()
            .iter()
            .map(|check| check.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_register_rejects_bad_config() {
        let module = DataModule::new();
        assert!(matches!(
            module.register("x", "DataType=memdb,ConnectionString=foo"),
            Err(DbError::UnknownDialect { .. })
        ));
        assert!(matches!(
            module.register("x", "DataType=sqlite"),
            Err(DbError::Configuration { .. })
        ));
        assert!(matches!(
            module.register(" ", MEMORY),
            Err(DbError::Configuration { .. })
        ));
        assert!(module.keys().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_closes_pools() {
        let module = DataModule::new();
        let context = module.register("default", MEMORY).unwrap();
        context
            .execute_sql(&crate::db::Chain::new(), "SELECT 1", Vec::new())
            .await
            .unwrap();
        assert_eq!(module.pools().len(), 1);
        module.shutdown().await;
        assert!(module.pools().is_empty());
    }
}
