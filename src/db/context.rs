//! Database contexts and transaction scope.
//!
//! A [`DbContext`] binds one logical database (a [`DatabaseConfig`]) to its
//! driver capability and the shared [`PoolCache`]. All statements take a
//! [`Chain`]; when that chain holds a transaction for this context's key the
//! statement runs inside it, otherwise on a pooled connection.

use crate::config::DatabaseConfig;
use crate::db::chain::{ActiveTransaction, Chain};
use crate::db::driver::{DataDriver, IsolationLevel, NativePool};
use crate::db::pool::PoolCache;
use crate::db::registry::DriverRegistry;
use crate::db::Dialect;
use crate::error::{DbError, DbResult};
use crate::models::{Row, Statement, Value, from_row};
use crate::models::row::from_scalar;
use crate::query::{TableOptions, TableRow, TableSet};
use futures_util::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Handle to one logical database. Cheap to clone.
#[derive(Clone)]
pub struct DbContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    config: DatabaseConfig,
    driver: Arc<dyn DataDriver>,
    dialect: Dialect,
    pools: Arc<PoolCache>,
}

impl DbContext {
    /// Bind `config` to its registered driver.
    ///
    /// Fails with [`DbError::UnknownDialect`] when no driver is registered
    /// for the data type. No connection is opened until the first statement.
    pub fn new(
        config: DatabaseConfig,
        registry: &DriverRegistry,
        pools: Arc<PoolCache>,
    ) -> DbResult<Self> {
        let driver = registry.resolve(&config.data_type)?;
        let dialect = driver.dialect();
        Ok(Self {
            inner: Arc::new(ContextInner {
                config,
                driver,
                dialect,
                pools,
            }),
        })
    }

    /// Parse `config_string` for `key_name` and bind it.
    pub fn from_config_string(
        key_name: impl Into<String>,
        config_string: &str,
        registry: &DriverRegistry,
        pools: Arc<PoolCache>,
    ) -> DbResult<Self> {
        Self::new(DatabaseConfig::parse(key_name, config_string)?, registry, pools)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    pub fn key_name(&self) -> &str {
        &self.inner.config.key_name
    }

    pub fn database_name(&self) -> &str {
        &self.inner.config.database_name
    }

    pub fn dialect(&self) -> Dialect {
        self.inner.dialect
    }

    pub fn driver(&self) -> &Arc<dyn DataDriver> {
        &self.inner.driver
    }

    /// Substitute `{database}` with the derived database name.
    pub fn replace_database(&self, sql: &str) -> String {
        sql.replace("{database}", self.database_name())
    }

    async fn pool(&self) -> DbResult<Arc<dyn NativePool>> {
        self.inner
            .pools
            .open_or_get(&self.inner.config, self.inner.driver.as_ref())
            .await
    }

    /// Open a transaction for this database on `chain`.
    pub async fn begin(&self, chain: &Chain, isolation: Option<IsolationLevel>) -> DbResult<()> {
        let key = self.key_name();
        if chain.in_transaction(key) {
            return Err(DbError::transaction_already_active(self.database_name(), chain));
        }

        let native = self.pool().await?.begin(isolation).await?;
        let active = Arc::new(ActiveTransaction::new(native, isolation));

        if !chain.try_insert(key, Arc::clone(&active)) {
            // Another task on the same chain won the slot
            if let Some(native) = active.finish().await {
                if let Err(e) = native.rollback().await {
                    warn!(database = %self.database_name(), error = %e, "Failed to release duplicate transaction");
                }
            }
            return Err(DbError::transaction_already_active(self.database_name(), chain));
        }

        info!(
            database = %self.database_name(),
            chain = %chain,
            isolation = ?isolation,
            "Transaction started"
        );
        Ok(())
    }

    /// Commit the chain's transaction.
    ///
    /// Fails with [`DbError::NoActiveTransaction`] when nothing is open. A
    /// transaction in which a statement failed is rolled back instead and
    /// reported as [`DbError::TransactionAborted`].
    pub async fn commit(&self, chain: &Chain) -> DbResult<()> {
        let active = chain
            .take(self.key_name())
            .ok_or_else(|| DbError::no_active_transaction(self.database_name(), chain))?;
        let failed = active.is_failed();
        let native = active
            .finish()
            .await
            .ok_or_else(|| DbError::no_active_transaction(self.database_name(), chain))?;

        if failed {
            native.rollback().await?;
            warn!(database = %self.database_name(), chain = %chain, "Transaction rolled back after failed statement");
            return Err(DbError::transaction_aborted(
                self.database_name(),
                "a statement failed inside the transaction",
            ));
        }

        native.commit().await?;
        info!(database = %self.database_name(), chain = %chain, "Transaction committed");
        Ok(())
    }

    /// Roll back the chain's transaction.
    pub async fn rollback(&self, chain: &Chain) -> DbResult<()> {
        let native = match chain.take(self.key_name()) {
            Some(active) => active.finish().await,
            None => None,
        }
        .ok_or_else(|| DbError::no_active_transaction(self.database_name(), chain))?;

        native.rollback().await?;
        info!(database = %self.database_name(), chain = %chain, "Transaction rolled back");
        Ok(())
    }

    /// Run `f` inside a transaction with the driver's default isolation.
    ///
    /// See [`DbContext::transaction_with`].
    pub async fn transaction<F, Fut, R, E>(&self, chain: &Chain, f: F) -> Result<R, E>
    where
        F: FnOnce(Chain) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<DbError>,
    {
        self.transaction_with(chain, None, f).await
    }

    /// Run `f` inside a transaction.
    ///
    /// Reentrant: when `chain` already has a transaction open for this
    /// database, `f` joins it and the outer scope decides the outcome.
    /// Otherwise a transaction is begun, committed when `f` returns `Ok`, and
    /// rolled back when `f` returns `Err`, panics, or any statement inside
    /// failed.
    pub async fn transaction_with<F, Fut, R, E>(
        &self,
        chain: &Chain,
        isolation: Option<IsolationLevel>,
        f: F,
    ) -> Result<R, E>
    where
        F: FnOnce(Chain) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: From<DbError>,
    {
        if chain.in_transaction(self.key_name()) {
            debug!(database = %self.database_name(), chain = %chain, "Joining active transaction");
            return f(chain.clone()).await;
        }

        self.begin(chain, isolation).await?;

        match AssertUnwindSafe(f(chain.clone())).catch_unwind().await {
            Ok(Ok(value)) => {
                self.commit(chain).await?;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.rollback_quietly(chain).await;
                Err(err)
            }
            Err(panic) => {
                self.rollback_quietly(chain).await;
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn rollback_quietly(&self, chain: &Chain) {
        match self.rollback(chain).await {
            Ok(()) | Err(DbError::NoActiveTransaction { .. }) => {}
            Err(e) => {
                warn!(database = %self.database_name(), chain = %chain, error = %e, "Rollback failed")
            }
        }
    }

    /// The session statements on `chain` run on: the open transaction, or
    /// the pool.
    pub async fn original(&self, chain: &Chain) -> DbResult<Session> {
        let target = match chain.get(self.key_name()) {
            Some(active) => SessionTarget::Transaction(active),
            None => SessionTarget::Pool(self.pool().await?),
        };
        Ok(Session {
            target,
            dialect: self.dialect(),
            database: self.database_name().to_string(),
            chain: chain.to_string(),
        })
    }

    /// Execute raw SQL and return the number of affected rows.
    pub async fn execute_sql(&self, chain: &Chain, sql: &str, args: Vec<Value>) -> DbResult<u64> {
        let statement = Statement::new(self.replace_database(sql), args);
        self.original(chain).await?.execute(&statement).await
    }

    /// Execute raw SQL and decode every row.
    pub async fn execute_sql_to_result<T>(
        &self,
        chain: &Chain,
        sql: &str,
        args: Vec<Value>,
    ) -> DbResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let statement = Statement::new(self.replace_database(sql), args);
        let rows = self.original(chain).await?.fetch_all(&statement).await?;
        rows.into_iter().map(from_row).collect()
    }

    /// Execute raw SQL and decode the first column of the first row.
    ///
    /// No rows yields `V::default()`.
    pub async fn execute_sql_to_value<V>(
        &self,
        chain: &Chain,
        sql: &str,
        args: Vec<Value>,
    ) -> DbResult<V>
    where
        V: Serialize + DeserializeOwned + Default,
    {
        let statement = Statement::new(self.replace_database(sql), args);
        let rows = self.original(chain).await?.fetch_all(&statement).await?;
        match rows.into_iter().next().and_then(first_column) {
            Some(value) => from_scalar(value),
            None => Ok(V::default()),
        }
    }

    /// List the databases visible to this connection.
    pub async fn get_database_list(&self, chain: &Chain) -> DbResult<Vec<String>> {
        let statement = Statement::raw(self.dialect().database_list_sql());
        let rows = self.original(chain).await?.fetch_all(&statement).await?;
        rows.into_iter()
            .filter_map(first_column)
            .map(from_scalar)
            .collect()
    }

    /// List the tables of `database`, or of this context's database when
    /// `None`.
    pub async fn get_table_list(
        &self,
        chain: &Chain,
        database: Option<&str>,
    ) -> DbResult<Vec<String>> {
        let database = database.unwrap_or(self.database_name());
        let statement = self.dialect().table_list_sql(database);
        let rows = self.original(chain).await?.fetch_all(&statement).await?;
        rows.into_iter()
            .filter_map(first_column)
            .map(from_scalar)
            .collect()
    }

    pub async fn has_table(&self, chain: &Chain, table: &str) -> DbResult<bool> {
        let tables = self.get_table_list(chain, None).await?;
        Ok(tables.iter().any(|name| name.eq_ignore_ascii_case(table)))
    }

    /// Table handle using the row shape's default table name.
    pub fn table<T: TableRow>(&self) -> TableSet<T> {
        TableSet::new(self.clone(), TableOptions::default())
    }

    /// Table handle with explicit options.
    pub fn table_with<T: TableRow>(&self, options: TableOptions) -> TableSet<T> {
        TableSet::new(self.clone(), options)
    }

    /// Table handle that is migrated first when `options.migrate` is set or
    /// the configuration string carries a `Migrate` key.
    pub async fn init_table<T: TableRow>(
        &self,
        chain: &Chain,
        options: TableOptions,
    ) -> DbResult<TableSet<T>> {
        let set = self.table_with::<T>(options);
        if set.migrate_enabled() || self.config().migrate.is_some() {
            set.migrate(chain).await?;
        }
        Ok(set)
    }
}

impl std::fmt::Debug for DbContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbContext")
            .field("config", &self.inner.config)
            .field("dialect", &self.inner.dialect)
            .finish()
    }
}

fn first_column(row: Row) -> Option<serde_json::Value> {
    row.into_iter().next().map(|(_, value)| value)
}

enum SessionTarget {
    Transaction(Arc<ActiveTransaction>),
    Pool(Arc<dyn NativePool>),
}

/// Where a chain's statements execute for one database.
///
/// Statements are prepared for the dialect (placeholders, list expansion)
/// before they reach the driver.
pub struct Session {
    target: SessionTarget,
    dialect: Dialect,
    database: String,
    chain: String,
}

impl Session {
    pub fn is_transaction(&self) -> bool {
        matches!(self.target, SessionTarget::Transaction(_))
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub async fn execute(&self, statement: &Statement) -> DbResult<u64> {
        let prepared = self.prepare(statement)?;
        match &self.target {
            SessionTarget::Pool(pool) => pool.execute(&prepared).await,
            SessionTarget::Transaction(active) => {
                let mut guard = active.native().lock().await;
                let tx = guard.as_mut().ok_or_else(|| self.finished_error())?;
                let result = tx.execute(&prepared).await;
                if result.is_err() {
                    active.mark_failed();
                }
                result
            }
        }
    }

    pub async fn fetch_all(&self, statement: &Statement) -> DbResult<Vec<Row>> {
        let prepared = self.prepare(statement)?;
        match &self.target {
            SessionTarget::Pool(pool) => pool.fetch_all(&prepared).await,
            SessionTarget::Transaction(active) => {
                let mut guard = active.native().lock().await;
                let tx = guard.as_mut().ok_or_else(|| self.finished_error())?;
                let result = tx.fetch_all(&prepared).await;
                if result.is_err() {
                    active.mark_failed();
                }
                result
            }
        }
    }

    fn prepare(&self, statement: &Statement) -> DbResult<Statement> {
        let prepared = self.dialect.prepare(statement)?;
        debug!(
            database = %self.database,
            chain = %self.chain,
            transaction = self.is_transaction(),
            sql = %prepared.sql,
            args = ?prepared.args,
            "Executing statement"
        );
        Ok(prepared)
    }

    fn finished_error(&self) -> DbError {
        DbError::transaction_aborted(&self.database, "transaction already finished")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> DbContext {
        DbContext::from_config_string(
            "test",
            "DataType=sqlite,ConnectionString=sqlite::memory:",
            &DriverRegistry::with_defaults(),
            Arc::new(PoolCache::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_unknown_dialect_fails_construction() {
        let err = DbContext::from_config_string(
            "x",
            "DataType=oracle,ConnectionString=foo",
            &DriverRegistry::with_defaults(),
            Arc::new(PoolCache::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, DbError::UnknownDialect { .. }));
    }

    #[tokio::test]
    async fn test_commit_without_transaction() {
        let ctx = context();
        let chain = Chain::new();
        assert!(matches!(
            ctx.commit(&chain).await,
            Err(DbError::NoActiveTransaction { .. })
        ));
        assert!(matches!(
            ctx.rollback(&chain).await,
            Err(DbError::NoActiveTransaction { .. })
        ));
    }

    #[tokio::test]
    async fn test_double_begin() {
        let ctx = context();
        let chain = Chain::new();
        ctx.begin(&chain, None).await.unwrap();
        assert!(matches!(
            ctx.begin(&chain, None).await,
            Err(DbError::TransactionAlreadyActive { .. })
        ));
        ctx.rollback(&chain).await.unwrap();
        assert!(!chain.in_transaction("test"));
    }

    #[tokio::test]
    async fn test_original_session_kind() {
        let ctx = context();
        let chain = Chain::new();
        assert!(!ctx.original(&chain).await.unwrap().is_transaction());
        ctx.begin(&chain, None).await.unwrap();
        assert!(ctx.original(&chain).await.unwrap().is_transaction());
        ctx.commit(&chain).await.unwrap();
    }

    #[tokio::test]
    async fn test_execute_sql_to_value_defaults() {
        let ctx = context();
        let chain = Chain::new();
        ctx.execute_sql(&chain, "CREATE TABLE t (v INTEGER)", Vec::new())
            .await
            .unwrap();
        let v: i64 = ctx
            .execute_sql_to_value(&chain, "SELECT v FROM t", Vec::new())
            .await
            .unwrap();
        assert_eq!(v, 0);
        ctx.execute_sql(&chain, "INSERT INTO t (v) VALUES (?)", crate::args![42])
            .await
            .unwrap();
        let v: i64 = ctx
            .execute_sql_to_value(&chain, "SELECT v FROM t", Vec::new())
            .await
            .unwrap();
        assert_eq!(v, 42);
        assert!(ctx.has_table(&chain, "t").await.unwrap());
    }

    #[test]
    fn test_replace_database() {
        let ctx = context();
        assert_eq!(ctx.database_name(), ":memory:");
        assert_eq!(
            ctx.replace_database("SELECT * FROM {database}.t"),
            format!("SELECT * FROM {}.t", ctx.database_name())
        );
    }
}
