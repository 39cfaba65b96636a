//! Driver capability contract.
//!
//! A [`DataDriver`] opens native pools for one database engine and renders
//! its index DDL. Contexts only ever talk to engines through these traits, so
//! hosts can plug in engines the bundled sqlx drivers do not cover.

use crate::config::PoolSettings;
use crate::db::Dialect;
use crate::error::DbResult;
use crate::models::{Row, Statement};
use async_trait::async_trait;
use std::sync::Arc;

/// Transaction isolation level requested at `begin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Index definition: uniqueness plus the comma-separated column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxField {
    pub unique: bool,
    pub fields: String,
}

impl IdxField {
    pub fn new(unique: bool, fields: impl Into<String>) -> Self {
        Self {
            unique,
            fields: fields.into(),
        }
    }
}

/// Per-engine capability registered under a data type tag.
#[async_trait]
pub trait DataDriver: Send + Sync {
    /// Dialect used to render statements for pools opened by this driver.
    fn dialect(&self) -> Dialect;

    /// Open a pooled connection. Malformed DSNs and unreachable hosts fail
    /// with [`crate::DbError::Connection`].
    async fn open(
        &self,
        connection_string: &str,
        settings: &PoolSettings,
    ) -> DbResult<Arc<dyn NativePool>>;

    /// Render index DDL. Pure, no I/O.
    fn create_index(&self, table: &str, index_name: &str, field: &IdxField) -> String {
        self.dialect().create_index(table, index_name, field)
    }
}

/// An opened, pooled connection handle.
///
/// Statements arrive already prepared for the driver's dialect.
#[async_trait]
pub trait NativePool: Send + Sync {
    async fn execute(&self, statement: &Statement) -> DbResult<u64>;

    async fn fetch_all(&self, statement: &Statement) -> DbResult<Vec<Row>>;

    /// Lease a connection and start a transaction on it.
    async fn begin(&self, isolation: Option<IsolationLevel>)
    -> DbResult<Box<dyn NativeTransaction>>;

    async fn ping(&self) -> DbResult<()>;

    async fn close(&self);
}

/// A native transaction bound to one leased connection.
///
/// Dropping it without commit rolls back.
#[async_trait]
pub trait NativeTransaction: Send {
    async fn execute(&mut self, statement: &Statement) -> DbResult<u64>;

    async fn fetch_all(&mut self, statement: &Statement) -> DbResult<Vec<Row>>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_sql() {
        assert_eq!(IsolationLevel::ReadCommitted.to_sql(), "READ COMMITTED");
        assert_eq!(IsolationLevel::Serializable.to_string(), "SERIALIZABLE");
    }
}
