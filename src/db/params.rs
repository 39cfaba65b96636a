//! Parameter binding for the sqlx drivers.
//!
//! Statements reaching these functions are already prepared, so list
//! arguments have been expanded into individual values.

use crate::models::{Statement, Value};
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::types::Json;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    param: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Json(v) => query.bind(Json(v)),
        Value::Timestamp(v) => query.bind(*v),
        Value::List(_) => query.bind(Json(param.to_json())),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: Query<'q, Postgres, PgArguments>,
    param: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        Value::Json(v) => query.bind(Json(v)),
        Value::Timestamp(v) => query.bind(*v),
        Value::List(_) => query.bind(Json(param.to_json())),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        Value::Null => query.bind(None::<String>),
        Value::Bool(v) => query.bind(*v),
        Value::Int(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::String(v) => query.bind(v.as_str()),
        Value::Bytes(v) => query.bind(v.as_slice()),
        // SQLite doesn't have native JSON type, store as string
        Value::Json(v) => query.bind(v.to_string()),
        Value::Timestamp(v) => query.bind(*v),
        Value::List(_) => query.bind(param.to_json().to_string()),
    }
}

pub(crate) fn mysql_query(statement: &Statement) -> Query<'_, MySql, MySqlArguments> {
    statement
        .args
        .iter()
        .fold(sqlx::query(&statement.sql), bind_mysql_param)
}

pub(crate) fn postgres_query(statement: &Statement) -> Query<'_, Postgres, PgArguments> {
    statement
        .args
        .iter()
        .fold(sqlx::query(&statement.sql), bind_postgres_param)
}

pub(crate) fn sqlite_query(statement: &Statement) -> Query<'_, Sqlite, SqliteArguments<'_>> {
    statement
        .args
        .iter()
        .fold(sqlx::query(&statement.sql), bind_sqlite_param)
}
