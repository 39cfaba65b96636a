//! Transaction-scoped database contexts with a generic table query builder.
//!
//! A [`DbContext`] binds one configured database to a driver capability and
//! a shared [`PoolCache`]. Statements run on an explicit [`Chain`]: when the
//! chain has a transaction open for the database they join it, otherwise
//! they use a pooled connection. Tables are reached through
//! [`TableSet`]/[`TableQuery`]:
//!
//! ```ignore
//! let module = DataModule::new();
//! let db = module.register("default", "DataType=sqlite,ConnectionString=app.db")?;
//! let users = db.table::<UserPo>();
//!
//! let chain = Chain::new();
//! db.transaction(&chain, |chain| async move {
//!     users.query(&chain).insert(&UserPo { id: 1, name: "a".into() }).await?;
//!     users.query(&chain).where_eq("id", 1).update_value("name", "b").await?;
//!     Ok::<_, DbError>(())
//! })
//! .await?;
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod query;
pub mod repository;

pub use config::{Config, DatabaseConfig, PoolSettings};
pub use db::{Chain, DataModule, DbContext, Dialect, DriverRegistry, IsolationLevel, PoolCache};
pub use error::{DbError, DbResult};
pub use models::{PageList, Statement, Value};
pub use query::{TableOptions, TableQuery, TableRow, TableSet};
pub use repository::{DefaultRepository, Repositories, Repository};
