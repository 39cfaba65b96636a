//! Backend dispatch macro for the sqlx pool and transaction enums.
//!
//! Expands to a plain `match` at compile time, keeping the per-backend arms
//! readable side by side.

/// Generate match arms over a `sqlx_driver` enum (`DbPool` or
/// `DbTransaction`).
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(DbPool, self, {
///     MySql(p) => p.close().await,
///     Postgres(p) => p.close().await,
///     SQLite(p) => p.close().await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($kind:ident, $value:expr, { $($variant:ident($p:ident) => $body:expr),+ $(,)? }) => {
        match $value {
            $(
                $crate::db::sqlx_driver::$kind::$variant($p) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;
