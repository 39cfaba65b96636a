//! Connectivity and health checks.

use crate::config::{DEFAULT_CHECK_TIMEOUT_SECS, DatabaseConfig};
use crate::db::chain::Chain;
use crate::db::context::DbContext;
use crate::db::registry::DriverRegistry;
use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDateTime};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Checks whether a configuration string can reach its database.
///
/// Every check opens a dedicated pool that bypasses the [`PoolCache`] and is
/// closed afterwards.
///
/// [`PoolCache`]: crate::db::PoolCache
#[derive(Debug, Clone)]
pub struct ConnectionChecker {
    registry: Arc<DriverRegistry>,
}

impl ConnectionChecker {
    pub fn new(registry: Arc<DriverRegistry>) -> Self {
        Self { registry }
    }

    /// Parse, open, ping and close.
    pub async fn check(&self, config_string: &str) -> DbResult<bool> {
        check_connection(&self.registry, config_string).await
    }

    /// [`ConnectionChecker::check`] bounded by `timeout` (10 seconds when
    /// `None` or zero).
    ///
    /// The check runs on its own task; when the timer wins the task keeps
    /// running to completion in the background.
    pub async fn check_with_timeout(
        &self,
        config_string: &str,
        timeout: Option<Duration>,
    ) -> DbResult<bool> {
        let timeout = timeout
            .filter(|t| !t.is_zero())
            .unwrap_or(Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS));

        let registry = Arc::clone(&self.registry);
        let config_string = config_string.to_string();
        let task = tokio::spawn(async move { check_connection(&registry, &config_string).await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(DbError::internal(format!(
                "Connection check task failed: {}",
                join_err
            ))),
            Err(_) => Err(DbError::timeout("connection check", timeout.as_secs())),
        }
    }
}

async fn check_connection(registry: &DriverRegistry, config_string: &str) -> DbResult<bool> {
    if config_string.trim().is_empty() {
        return Err(DbError::configuration("Configuration string cannot be empty"));
    }

    let config = DatabaseConfig::from_config_string(config_string)?;
    let driver = registry.resolve(&config.data_type)?;
    let pool = driver
        .open(&config.connection_string, &config.pool_settings())
        .await?;

    let result = pool.ping().await;
    pool.close().await;

    match result {
        Ok(()) => {
            debug!(database = %config.database_name, data_type = %config.data_type, "Connection check passed");
            Ok(true)
        }
        Err(e) => {
            warn!(database = %config.database_name, error = %e, "Connection check ping failed");
            Err(e)
        }
    }
}

/// Per-context health probe reporting the server's current time.
#[derive(Debug, Clone)]
pub struct HealthCheck {
    name: String,
    context: DbContext,
}

impl HealthCheck {
    pub fn new(name: impl Into<String>, context: DbContext) -> Self {
        Self {
            name: name.into(),
            context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the dialect's "now" query; returns `Database.<name> => <time>`.
    pub async fn check(&self) -> DbResult<String> {
        let sql = self.context.dialect().now_sql();
        let now: JsonValue = self
            .context
            .execute_sql_to_value(&Chain::new(), sql, Vec::new())
            .await?;
        Ok(format!("Database.{} => {}", self.name, format_time(&now)))
    }
}

/// Render a server timestamp as `YYYY-MM-DD HH:MM:SS`.
fn format_time(value: &JsonValue) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
    let text = match value {
        JsonValue::String(s) => s.as_str(),
        other => return other.to_string(),
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return ts.format(FORMAT).to_string();
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|ts| ts.format(FORMAT).to_string())
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::PoolCache;
    use serde_json::json;

    #[test]
    fn test_format_time() {
        assert_eq!(
            format_time(&json!("2024-05-06T07:08:09.123+00:00")),
            "2024-05-06 07:08:09"
        );
        assert_eq!(format_time(&json!("2024-05-06 07:08:09")), "2024-05-06 07:08:09");
        assert_eq!(format_time(&json!("2024-05-06T07:08:09")), "2024-05-06 07:08:09");
        assert_eq!(format_time(&json!("yesterday")), "yesterday");
    }

    #[tokio::test]
    async fn test_check_empty_config() {
        let checker = ConnectionChecker::new(Arc::new(DriverRegistry::with_defaults()));
        let err = checker.check("").await.unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_check_sqlite() {
        let checker = ConnectionChecker::new(Arc::new(DriverRegistry::with_defaults()));
        let ok = checker
            .check_with_timeout("DataType=sqlite,ConnectionString=sqlite::memory:", None)
            .await
            .unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_health_check_sqlite() {
        let context = DbContext::from_config_string(
            "default",
            "DataType=sqlite,ConnectionString=sqlite::memory:",
            &DriverRegistry::with_defaults(),
            Arc::new(PoolCache::new()),
        )
        .unwrap();
        let report = HealthCheck::new("default", context).check().await.unwrap();
        assert!(report.starts_with("Database.default => "));
        assert_eq!(report.len(), "Database.default => ".len() + 19);
    }
}
