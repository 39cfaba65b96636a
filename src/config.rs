//! Configuration handling.
//!
//! A database context is configured with one flat configuration string:
//!
//! ```text
//! DataType=mysql,PoolMaxSize=50,PoolMinSize=1,ConnectionString=user:pass@tcp(127.0.0.1:3306)/db?charset=utf8mb4
//! ```
//!
//! The binary additionally reads CLI arguments and environment variables via
//! `clap`.

use crate::db::Dialect;
use crate::error::{DbError, DbResult};
use clap::Parser;
use std::time::Duration;
use tracing::warn;
use url::Url;

pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 10;

// Pool configuration defaults
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_MAX_CONNECTIONS_SQLITE: u32 = 1;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_LIFETIME_SECS: u64 = 3600;

/// Keys recognized in configuration strings (matched case-insensitively).
const CONFIG_KEYS: &[&str] = &[
    "datatype",
    "connectionstring",
    "poolmaxsize",
    "poolminsize",
    "migrate",
];

/// One logical database, parsed from a configuration string.
///
/// Immutable after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Identifies this logical database; pools are cached per key.
    pub key_name: String,
    /// Lowercased data type tag used to resolve the driver.
    pub data_type: String,
    /// Driver connection string (sensitive - not logged).
    pub connection_string: String,
    pub pool_max_size: u32,
    pub pool_min_size: u32,
    /// Present when the configuration string carries a `Migrate` key.
    pub migrate: Option<String>,
    /// Database name derived from the connection string.
    pub database_name: String,
}

impl DatabaseConfig {
    /// Parse a configuration string for the logical database `key_name`.
    ///
    /// # Format
    ///
    /// Comma or semicolon separated `Key=Value` pairs. A separator only
    /// starts a new pair when a known key follows it, so the connection
    /// string may itself contain `;`, `,` and `=`.
    ///
    /// ```text
    /// DataType=postgresql,ConnectionString=host=127.0.0.1 user=u password=p dbname=db port=5432
    /// DataType=sqlite;PoolMaxSize=5;ConnectionString=data/app.db
    /// ```
    pub fn parse(key_name: impl Into<String>, config_string: &str) -> DbResult<Self> {
        let key_name = key_name.into();
        let mut data_type = String::new();
        let mut connection_string = String::new();
        let mut pool_max_size = 0;
        let mut pool_min_size = 0;
        let mut migrate = None;

        for (key, value) in split_pairs(config_string) {
            match key.as_str() {
                "datatype" => data_type = value.to_lowercase(),
                "connectionstring" => connection_string = value,
                "poolmaxsize" => pool_max_size = parse_size(&key_name, "PoolMaxSize", &value)?,
                "poolminsize" => pool_min_size = parse_size(&key_name, "PoolMinSize", &value)?,
                "migrate" => migrate = Some(value),
                _ => {}
            }
        }

        if data_type.is_empty() {
            return Err(DbError::configuration(format!(
                "DataType is required for database '{}'",
                key_name
            )));
        }
        if connection_string.is_empty() {
            return Err(DbError::configuration(format!(
                "ConnectionString is required for database '{}'",
                key_name
            )));
        }

        let database_name = derive_database_name(&data_type, &connection_string);

        Ok(Self {
            key_name,
            data_type,
            connection_string,
            pool_max_size,
            pool_min_size,
            migrate,
            database_name,
        })
    }

    /// Parse a configuration string keyed by the string itself.
    pub fn from_config_string(config_string: &str) -> DbResult<Self> {
        Self::parse(config_string, config_string)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings::from_config(self)
    }

    /// Connection string with any password replaced by `***`.
    pub fn masked_connection_string(&self) -> String {
        mask_password(&self.connection_string)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("key_name", &mask_password(&self.key_name))
            .field("data_type", &self.data_type)
            .field("connection_string", &self.masked_connection_string())
            .field("pool_max_size", &self.pool_max_size)
            .field("pool_min_size", &self.pool_min_size)
            .field("migrate", &self.migrate)
            .field("database_name", &self.database_name)
            .finish()
    }
}

/// Split a configuration string into lowercased keys and values.
fn split_pairs(config_string: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    let mut delimiter = "";

    for piece in config_string.split_inclusive([',', ';']) {
        let (segment, next_delimiter) = match piece.char_indices().last() {
            Some((i, c)) if c == ',' || c == ';' => (&piece[..i], &piece[i..]),
            _ => (piece, ""),
        };

        let known = segment.split_once('=').and_then(|(key, value)| {
            let key = key.trim().to_ascii_lowercase();
            CONFIG_KEYS.contains(&key.as_str()).then_some((key, value))
        });

        match known {
            Some((key, value)) => pairs.push((key, value.trim().to_string())),
            None => match pairs.last_mut() {
                Some((key, value)) if key == "connectionstring" => {
                    value.push_str(delimiter);
                    value.push_str(segment);
                }
                _ if segment.trim().is_empty() => {}
                _ => warn!(
                    segment = %mask_password(segment),
                    "Ignoring unrecognized configuration segment"
                ),
            },
        }
        delimiter = next_delimiter;
    }

    pairs
}

fn parse_size(key_name: &str, field: &str, value: &str) -> DbResult<u32> {
    if value.trim().is_empty() {
        return Ok(0);
    }
    value.trim().parse::<u32>().map_err(|_| {
        DbError::configuration(format!(
            "{} must be a non-negative integer for database '{}', got '{}'",
            field, key_name, value
        ))
    })
}

/// Derive the database name from a connection string.
///
/// - sqlserver: the `database=` parameter
/// - sqlite: the database file name
/// - postgres: `dbname=` or the URL path
/// - mysql: the text after the last `/`, up to `?`
/// - clickhouse: the URL path, or the `database=` parameter
pub fn derive_database_name(data_type: &str, connection_string: &str) -> String {
    let conn = connection_string.trim();
    match Dialect::from_tag(data_type) {
        Some(Dialect::SqlServer) => find_param(conn, "database").unwrap_or_default(),
        Some(Dialect::Sqlite) => {
            let path = conn
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path = path.split('?').next().unwrap_or(path);
            std::path::Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string())
        }
        Some(Dialect::Postgres) => {
            if conn.contains("://") {
                url_path(conn).unwrap_or_default()
            } else {
                conn.split_whitespace()
                    .filter_map(|pair| pair.split_once('='))
                    .find(|(key, _)| key.eq_ignore_ascii_case("dbname"))
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_default()
            }
        }
        Some(Dialect::ClickHouse) => url_path(conn)
            .filter(|name| !name.is_empty())
            .or_else(|| find_param(conn, "database"))
            .unwrap_or_default(),
        Some(Dialect::MySql) | None => after_last_slash(conn),
    }
}

fn after_last_slash(conn: &str) -> String {
    match conn.rfind('/') {
        Some(idx) => {
            let tail = &conn[idx + 1..];
            tail.split('?').next().unwrap_or(tail).to_string()
        }
        None => String::new(),
    }
}

fn url_path(conn: &str) -> Option<String> {
    let url = Url::parse(conn).ok()?;
    Some(url.path().trim_start_matches('/').to_string())
}

/// Case-insensitive lookup of `name=` in URL query or `;`-separated form.
fn find_param(conn: &str, name: &str) -> Option<String> {
    let query = conn.split_once('?').map(|(_, q)| q).unwrap_or(conn);
    query
        .split(['&', ';'])
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case(name))
        .map(|(_, value)| value.trim().to_string())
}

/// Mask the password part of `user:password@host` style strings and
/// `password=` pairs.
pub fn mask_password(conn: &str) -> String {
    let mut masked = conn.to_string();

    if let Some(at) = masked.find('@') {
        let start = masked[..at].find("://").map(|i| i + 3).unwrap_or(0);
        if let Some(colon) = masked[start..at].find(':') {
            masked.replace_range(start + colon + 1..at, "***");
        }
    }

    let lower = masked.to_ascii_lowercase();
    if let Some(pos) = lower.find("password=") {
        let value_start = pos + "password=".len();
        let value_end = masked[value_start..]
            .find([' ', ';', '&', ','])
            .map(|i| value_start + i)
            .unwrap_or(masked.len());
        masked.replace_range(value_start..value_end, "***");
    }

    masked
}

/// Build a complete configuration string for a database server.
///
/// Pool sizes default to 50/1. Returns `None` for unsupported data types.
pub fn create_connection_string(
    data_type: &str,
    host: &str,
    port: u16,
    database: &str,
    username: &str,
    password: &str,
) -> Option<String> {
    let conn = match Dialect::from_tag(data_type)? {
        Dialect::SqlServer => format!(
            "DataType=sqlserver,PoolMaxSize=50,PoolMinSize=1,ConnectionString=sqlserver://{}:{}@{}:{}?database={}",
            username, password, host, port, database
        ),
        Dialect::Sqlite => format!(
            "DataType=sqlite,PoolMaxSize=50,PoolMinSize=1,ConnectionString={}",
            database
        ),
        Dialect::Postgres => format!(
            "DataType=postgresql,PoolMaxSize=50,PoolMinSize=1,ConnectionString=host={} user={} password={} dbname={} port={} sslmode=disable",
            host, username, password, database, port
        ),
        Dialect::MySql => format!(
            "DataType=mysql,PoolMaxSize=50,PoolMinSize=1,ConnectionString={}:{}@tcp({}:{})/{}?charset=utf8mb4",
            username, password, host, port, database
        ),
        Dialect::ClickHouse => format!(
            "DataType=clickhouse,PoolMaxSize=50,PoolMinSize=1,ConnectionString=clickhouse://{}:{}@{}:{}/{}?dial_timeout=10s&read_timeout=60s",
            username, password, host, port, database
        ),
    };
    Some(conn)
}

/// Pool sizing derived from a database configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    /// Maximum open connections; `None` uses the driver default.
    pub max_open: Option<u32>,
    /// Maximum idle connections, a third of `max_open` (at least 1).
    pub max_idle: Option<u32>,
    /// Connections kept open while idle.
    pub min_idle: u32,
    pub max_lifetime: Duration,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        let (max_open, max_idle) = if config.pool_max_size > 0 {
            let max = config.pool_max_size;
            (Some(max), Some((max / 3).max(1)))
        } else {
            (None, None)
        };
        let min_idle = match max_idle {
            Some(idle) => config.pool_min_size.min(idle),
            None => config.pool_min_size,
        };
        Self {
            max_open,
            max_idle,
            min_idle,
            ..Self::default()
        }
    }

    /// Get max_open with default value based on database type.
    pub fn max_open_or_default(&self, is_sqlite: bool) -> u32 {
        self.max_open.unwrap_or(if is_sqlite {
            DEFAULT_MAX_CONNECTIONS_SQLITE
        } else {
            DEFAULT_MAX_CONNECTIONS
        })
    }

    /// min_idle clamped to the effective pool size.
    pub fn min_idle_for(&self, is_sqlite: bool) -> u32 {
        self.min_idle.min(self.max_open_or_default(is_sqlite))
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_open: None,
            max_idle: None,
            min_idle: 0,
            max_lifetime: Duration::from_secs(DEFAULT_MAX_LIFETIME_SECS),
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-context",
    about = "Check connectivity of configured database contexts",
    version,
    author
)]
pub struct Config {
    /// Databases to check.
    /// Format: "key=<configuration string>" or just "<configuration string>".
    /// Can be specified multiple times; the environment variable separates
    /// entries with '|'.
    #[arg(
        short = 'd',
        long = "database",
        value_name = "KEY=CONFIG",
        env = "DB_CONTEXT_DATABASE",
        value_delimiter = '|'
    )]
    pub databases: Vec<String>,

    /// Connectivity check timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CHECK_TIMEOUT_SECS,
        env = "DB_CONTEXT_TIMEOUT"
    )]
    pub timeout: u64,

    /// Also query the server time through a pooled context
    #[arg(long, env = "DB_CONTEXT_NOW")]
    pub now: bool,

    /// Also list the tables of each database
    #[arg(long, env = "DB_CONTEXT_TABLES")]
    pub tables: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "DB_CONTEXT_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "DB_CONTEXT_JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            databases: Vec::new(),
            timeout: DEFAULT_CHECK_TIMEOUT_SECS,
            now: false,
            tables: false,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Split `--database` values into `(key, configuration string)`.
    ///
    /// Unnamed entries are keyed by their database name, or "default".
    pub fn parse_databases(&self) -> DbResult<Vec<(String, String)>> {
        self.databases
            .iter()
            .map(|entry| {
                let entry = entry.trim();
                match entry.split_once('=') {
                    Some((key, rest))
                        if !CONFIG_KEYS.contains(&key.trim().to_ascii_lowercase().as_str()) =>
                    {
                        let key = key.trim();
                        if key.is_empty() {
                            return Err(DbError::configuration(format!(
                                "Empty database key in '{}'",
                                mask_password(entry)
                            )));
                        }
                        Ok((key.to_string(), rest.to_string()))
                    }
                    _ => {
                        let config = DatabaseConfig::from_config_string(entry)?;
                        let key = if config.database_name.is_empty() {
                            "default".to_string()
                        } else {
                            config.database_name
                        };
                        Ok((key, entry.to_string()))
                    }
                }
            })
            .collect()
    }

    /// Get the check timeout as a Duration.
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mysql_config() {
        let config = DatabaseConfig::parse(
            "test",
            "DataType=MySQL,PoolMaxSize=50,PoolMinSize=1,ConnectionString=root:pw@tcp(127.0.0.1:3306)/test?charset=utf8mb4&parseTime=True&loc=Local",
        )
        .unwrap();
        assert_eq!(config.key_name, "test");
        assert_eq!(config.data_type, "mysql");
        assert_eq!(config.pool_max_size, 50);
        assert_eq!(config.pool_min_size, 1);
        assert_eq!(
            config.connection_string,
            "root:pw@tcp(127.0.0.1:3306)/test?charset=utf8mb4&parseTime=True&loc=Local"
        );
        assert_eq!(config.database_name, "test");
        assert_eq!(config.migrate, None);
    }

    #[test]
    fn test_parse_keys_case_insensitive_and_semicolons() {
        let config =
            DatabaseConfig::parse("k", "datatype=sqlite;connectionstring=data/app.db;migrate=")
                .unwrap();
        assert_eq!(config.data_type, "sqlite");
        assert_eq!(config.connection_string, "data/app.db");
        assert_eq!(config.database_name, "app.db");
        assert_eq!(config.migrate, Some(String::new()));
    }

    #[test]
    fn test_connection_string_keeps_delimiters() {
        let config = DatabaseConfig::parse(
            "mssql",
            "DataType=sqlserver,ConnectionString=Server=db;Database=sales;User Id=sa,PoolMaxSize=9",
        )
        .unwrap();
        assert_eq!(
            config.connection_string,
            "Server=db;Database=sales;User Id=sa"
        );
        assert_eq!(config.database_name, "sales");
        assert_eq!(config.pool_max_size, 9);
    }

    #[test]
    fn test_missing_required_keys() {
        let err = DatabaseConfig::parse("k", "ConnectionString=a.db").unwrap_err();
        assert!(matches!(err, DbError::Configuration { .. }));
        let err = DatabaseConfig::parse("k", "DataType=mysql").unwrap_err();
        assert!(err.to_string().contains("ConnectionString"));
    }

    #[test]
    fn test_invalid_pool_size() {
        let err =
            DatabaseConfig::parse("k", "DataType=mysql,PoolMaxSize=abc,ConnectionString=x/y")
                .unwrap_err();
        assert!(err.to_string().contains("PoolMaxSize"));
    }

    #[test]
    fn test_database_name_extraction() {
        assert_eq!(
            derive_database_name("postgresql", "host=127.0.0.1 user=u password=p dbname=orders port=5432"),
            "orders"
        );
        assert_eq!(
            derive_database_name("postgres", "postgres://u:p@localhost:5432/orders"),
            "orders"
        );
        assert_eq!(
            derive_database_name("sqlserver", "sqlserver://u:p@127.0.0.1:1433?database=crm"),
            "crm"
        );
        assert_eq!(
            derive_database_name("clickhouse", "clickhouse://u:p@127.0.0.1:9000/logs?dial_timeout=10s"),
            "logs"
        );
        assert_eq!(derive_database_name("sqlite", "sqlite:/tmp/app.db?mode=rwc"), "app.db");
        assert_eq!(derive_database_name("mysql", "mysql://u:p@h/shop"), "shop");
    }

    #[test]
    fn test_pool_settings() {
        let config =
            DatabaseConfig::parse("k", "DataType=mysql,PoolMaxSize=50,PoolMinSize=30,ConnectionString=x/y")
                .unwrap();
        let settings = config.pool_settings();
        assert_eq!(settings.max_open, Some(50));
        assert_eq!(settings.max_idle, Some(16));
        assert_eq!(settings.min_idle, 16);
        assert_eq!(settings.max_lifetime, Duration::from_secs(3600));
    }

    #[test]
    fn test_pool_settings_small_pool_keeps_one_idle() {
        let config =
            DatabaseConfig::parse("k", "DataType=mysql,PoolMaxSize=2,PoolMinSize=1,ConnectionString=x/y")
                .unwrap();
        assert_eq!(config.pool_settings().max_idle, Some(1));
    }

    #[test]
    fn test_pool_settings_defaults_without_max() {
        let config = DatabaseConfig::parse("k", "DataType=sqlite,ConnectionString=a.db").unwrap();
        let settings = config.pool_settings();
        assert_eq!(settings.max_open, None);
        assert_eq!(settings.max_open_or_default(true), DEFAULT_MAX_CONNECTIONS_SQLITE);
        assert_eq!(settings.max_open_or_default(false), DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("root:secret@tcp(127.0.0.1:3306)/db"),
            "root:***@tcp(127.0.0.1:3306)/db"
        );
        assert_eq!(
            mask_password("postgres://u:secret@h/db"),
            "postgres://u:***@h/db"
        );
        assert_eq!(
            mask_password("host=h user=u password=secret dbname=d"),
            "host=h user=u password=*** dbname=d"
        );
        assert_eq!(mask_password("data/app.db"), "data/app.db");
    }

    #[test]
    fn test_debug_masks_password() {
        let config = DatabaseConfig::parse("k", "DataType=mysql,ConnectionString=u:secret@tcp(h:1)/d")
            .unwrap();
        assert!(!format!("{:?}", config).contains("secret"));
    }

    #[test]
    fn test_create_connection_string_round_trips() {
        let conn = create_connection_string("mysql", "127.0.0.1", 3306, "shop", "root", "pw").unwrap();
        let config = DatabaseConfig::parse("shop", &conn).unwrap();
        assert_eq!(config.data_type, "mysql");
        assert_eq!(config.pool_max_size, 50);
        assert_eq!(config.database_name, "shop");

        let conn =
            create_connection_string("postgres", "127.0.0.1", 5432, "orders", "u", "p").unwrap();
        assert_eq!(DatabaseConfig::parse("o", &conn).unwrap().database_name, "orders");

        assert!(create_connection_string("oracle", "h", 1, "d", "u", "p").is_none());
    }

    #[test]
    fn test_cli_parse_databases() {
        let mut config = Config::default();
        config.databases = vec![
            "main=DataType=sqlite,ConnectionString=main.db".to_string(),
            "DataType=sqlite,ConnectionString=other.db".to_string(),
        ];
        let parsed = config.parse_databases().unwrap();
        assert_eq!(parsed[0].0, "main");
        assert_eq!(parsed[0].1, "DataType=sqlite,ConnectionString=main.db");
        assert_eq!(parsed[1].0, "other.db");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.timeout_duration(), Duration::from_secs(10));
        assert!(config.databases.is_empty());
    }
}
