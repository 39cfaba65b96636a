//! Error types for database contexts and table queries.
//!
//! All fallible operations return [`DbResult`]. Configuration and dialect
//! errors are raised eagerly while wiring contexts; everything else comes back
//! from individual statements.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown dialect '{tag}': no driver registered for this data type")]
    UnknownDialect { tag: String },

    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Transaction already active for database '{key}' in chain {chain}")]
    TransactionAlreadyActive { key: String, chain: String },

    #[error("No active transaction for database '{key}' in chain {chain}")]
    NoActiveTransaction { key: String, chain: String },

    #[error("Transaction aborted for database '{key}': {reason}")]
    TransactionAborted { key: String, reason: String },

    #[error("Constraint violation: {message}")]
    ConstraintViolation {
        message: String,
        /// e.g., "23505" for unique violation on PostgreSQL
        sql_state: Option<String>,
    },

    #[error("Query error: {message}")]
    Query {
        message: String,
        sql_state: Option<String>,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn unknown_dialect(tag: impl Into<String>) -> Self {
        Self::UnknownDialect { tag: tag.into() }
    }

    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub fn transaction_already_active(key: impl Into<String>, chain: impl ToString) -> Self {
        Self::TransactionAlreadyActive {
            key: key.into(),
            chain: chain.to_string(),
        }
    }

    pub fn no_active_transaction(key: impl Into<String>, chain: impl ToString) -> Self {
        Self::NoActiveTransaction {
            key: key.into(),
            chain: chain.to_string(),
        }
    }

    pub fn transaction_aborted(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a query error without SQL state.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
            sql_state: None,
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQLSTATE reported by the server, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Query { sql_state, .. } | Self::ConstraintViolation { sql_state, .. } => {
                sql_state.as_deref()
            }
            _ => None,
        }
    }

    /// Check if this error is retryable.
    ///
    /// Failed pool opens are never cached, so connection errors may succeed on
    /// the next call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout { .. })
    }

    /// Configuration and dialect errors abort module startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. }
                | Self::UnknownDialect { .. }
                | Self::TransactionAlreadyActive { .. }
        )
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::configuration(msg.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                    DbError::ConstraintViolation {
                        message: db_err.message().to_string(),
                        sql_state: code,
                    }
                } else {
                    DbError::Query {
                        message: db_err.message().to_string(),
                        sql_state: code,
                    }
                }
            }
            sqlx::Error::RowNotFound => DbError::query("No rows returned"),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire", 30),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Reopen the database context")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::query(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::decode(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::decode(source.to_string()),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::decode(err.to_string())
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::connection("refused", "Check the host");
        assert_eq!(err.suggestion(), Some("Check the host"));
        assert_eq!(DbError::query("bad column").suggestion(), None);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DbError::timeout("query", 30).is_retryable());
        assert!(DbError::connection("err", "sugg").is_retryable());
        assert!(!DbError::configuration("missing DataType").is_retryable());
        assert!(!DbError::unknown_dialect("memdb").is_retryable());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(DbError::configuration("x").is_fatal());
        assert!(DbError::unknown_dialect("oracle").is_fatal());
        assert!(DbError::transaction_already_active("t1", "chain").is_fatal());
        assert!(!DbError::query("syntax").is_fatal());
    }

    #[test]
    fn test_sql_state() {
        let err = DbError::ConstraintViolation {
            message: "duplicate key".into(),
            sql_state: Some("23505".into()),
        };
        assert_eq!(err.sql_state(), Some("23505"));
        assert_eq!(DbError::internal("x").sql_state(), None);
    }

    #[test]
    fn test_unknown_dialect_message_names_tag() {
        let err = DbError::unknown_dialect("memdb");
        assert!(err.to_string().contains("'memdb'"));
    }
}
