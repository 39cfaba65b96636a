//! Shared fixtures: temporary SQLite contexts, row shapes and fake drivers.

#![allow(dead_code)]

use async_trait::async_trait;
use db_context::config::PoolSettings;
use db_context::db::{
    DataDriver, DbContext, Dialect, DriverRegistry, IdxField, IsolationLevel, NativePool,
    NativeTransaction, PoolCache, SqliteDriver,
};
use db_context::error::DbResult;
use db_context::models::{Row, Statement};
use db_context::query::TableRow;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPo {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

impl TableRow for UserPo {
    const PRIMARY_KEY: &'static [&'static str] = &["id"];

    fn table_name() -> String {
        "users".to_string()
    }

    fn create_table_sql() -> Option<String> {
        Some(
            "CREATE TABLE {table} (id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name TEXT NOT NULL DEFAULT '', age INTEGER NOT NULL DEFAULT 0)"
                .to_string(),
        )
    }

    fn indexes() -> Vec<(String, IdxField)> {
        vec![("idx_users_name".to_string(), IdxField::new(false, "name"))]
    }
}

pub fn user(id: i64, name: &str, age: i64) -> UserPo {
    UserPo {
        id,
        name: name.to_string(),
        age,
    }
}

/// A context on a fresh SQLite file. Keep the fixture alive for the test.
pub struct SqliteFixture {
    pub dir: TempDir,
    pub registry: DriverRegistry,
    pub pools: Arc<PoolCache>,
    pub context: DbContext,
}

pub fn config_string(dir: &TempDir) -> String {
    let path = dir.path().join("test.db");
    format!(
        "DataType=sqlite,PoolMaxSize=5,ConnectionString=sqlite:{}?mode=rwc",
        path.display()
    )
}

pub fn sqlite_fixture() -> SqliteFixture {
    let dir = tempfile::tempdir().unwrap();
    let registry = DriverRegistry::with_defaults();
    let pools = Arc::new(PoolCache::new());
    let context =
        DbContext::from_config_string("test", &config_string(&dir), &registry, pools.clone())
            .unwrap();
    SqliteFixture {
        dir,
        registry,
        pools,
        context,
    }
}

/// SQLite fixture with the `users` table created.
pub async fn users_fixture() -> SqliteFixture {
    let fixture = sqlite_fixture();
    fixture
        .context
        .init_table::<UserPo>(
            &db_context::db::Chain::new(),
            db_context::query::TableOptions::default().with_migrate(),
        )
        .await
        .unwrap();
    fixture
}

/// SQLite driver that counts `open` calls and widens the open window.
#[derive(Default)]
pub struct CountingDriver {
    pub opens: AtomicUsize,
}

impl CountingDriver {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataDriver for CountingDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn open(
        &self,
        connection_string: &str,
        settings: &PoolSettings,
    ) -> DbResult<Arc<dyn NativePool>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        SqliteDriver.open(connection_string, settings).await
    }
}

/// Driver whose `open` never finishes in time.
pub struct SlowDriver(pub Duration);

#[async_trait]
impl DataDriver for SlowDriver {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn open(
        &self,
        connection_string: &str,
        settings: &PoolSettings,
    ) -> DbResult<Arc<dyn NativePool>> {
        tokio::time::sleep(self.0).await;
        SqliteDriver.open(connection_string, settings).await
    }
}

/// Statement log shared by a recording pool and its transactions.
#[derive(Debug, Clone, Default)]
pub struct StatementLog(Arc<Mutex<Vec<Statement>>>);

impl StatementLog {
    fn push(&self, statement: &Statement) {
        self.0.lock().unwrap().push(statement.clone());
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.0.lock().unwrap().clone()
    }

    pub fn last(&self) -> Statement {
        self.statements().pop().expect("no statement recorded")
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Driver that records every prepared statement and returns no rows.
pub struct RecordingDriver {
    pub dialect: Dialect,
    pub log: StatementLog,
}

impl RecordingDriver {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            log: StatementLog::default(),
        }
    }
}

#[async_trait]
impl DataDriver for RecordingDriver {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn open(
        &self,
        _connection_string: &str,
        _settings: &PoolSettings,
    ) -> DbResult<Arc<dyn NativePool>> {
        Ok(Arc::new(RecordingPool {
            log: self.log.clone(),
        }))
    }
}

struct RecordingPool {
    log: StatementLog,
}

#[async_trait]
impl NativePool for RecordingPool {
    async fn execute(&self, statement: &Statement) -> DbResult<u64> {
        self.log.push(statement);
        Ok(1)
    }

    async fn fetch_all(&self, statement: &Statement) -> DbResult<Vec<Row>> {
        self.log.push(statement);
        Ok(Vec::new())
    }

    async fn begin(
        &self,
        _isolation: Option<IsolationLevel>,
    ) -> DbResult<Box<dyn NativeTransaction>> {
        self.log.push(&Statement::raw("BEGIN"));
        Ok(Box::new(RecordingTx {
            log: self.log.clone(),
        }))
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    async fn close(&self) {}
}

struct RecordingTx {
    log: StatementLog,
}

#[async_trait]
impl NativeTransaction for RecordingTx {
    async fn execute(&mut self, statement: &Statement) -> DbResult<u64> {
        self.log.push(statement);
        Ok(1)
    }

    async fn fetch_all(&mut self, statement: &Statement) -> DbResult<Vec<Row>> {
        self.log.push(statement);
        Ok(Vec::new())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.log.push(&Statement::raw("COMMIT"));
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.log.push(&Statement::raw("ROLLBACK"));
        Ok(())
    }
}

/// Context on a [`RecordingDriver`] registered as `memdb`.
pub fn recording_context(dialect: Dialect) -> (DbContext, StatementLog) {
    let driver = RecordingDriver::new(dialect);
    let log = driver.log.clone();
    let registry = DriverRegistry::new();
    registry.register("memdb", Arc::new(driver));
    let context = DbContext::from_config_string(
        "t1",
        "DataType=memdb,ConnectionString=memdb://local/t1",
        &registry,
        Arc::new(PoolCache::new()),
    )
    .unwrap();
    (context, log)
}
