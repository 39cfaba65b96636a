//! Database layer.
//!
//! - Dialect rendering and statement preparation
//! - Driver capabilities, the driver registry and the bundled sqlx drivers
//! - The shared pool cache
//! - Execution chains and transaction-scoped contexts
//! - Health checks and the database module

pub mod chain;
pub mod context;
pub mod dialect;
pub mod driver;
pub mod health;
#[macro_use]
pub mod macros;
pub mod module;
pub mod params;
pub mod pool;
pub mod registry;
pub mod sqlx_driver;
pub mod types;

pub use chain::Chain;
pub use context::{DbContext, Session};
pub use dialect::{Dialect, IndexHint};
pub use driver::{DataDriver, IdxField, IsolationLevel, NativePool, NativeTransaction};
pub use health::{ConnectionChecker, HealthCheck};
pub use module::DataModule;
pub use pool::PoolCache;
pub use registry::DriverRegistry;
pub use sqlx_driver::{DbPool, DbTransaction, MySqlDriver, PostgresDriver, SqliteDriver};
