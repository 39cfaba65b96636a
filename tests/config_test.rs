//! Configuration strings, CLI database entries and pool settings.

use db_context::config::{
    Config, DatabaseConfig, PoolSettings, create_connection_string, mask_password,
};
use db_context::error::DbError;
use std::time::Duration;

#[test]
fn test_connection_string_may_contain_separators() {
    let config = DatabaseConfig::parse(
        "pg",
        "DataType=PostgreSQL,PoolMaxSize=9,ConnectionString=host=127.0.0.1 user=u password=a;b,c dbname=shop port=5432",
    )
    .unwrap();
    assert_eq!(config.data_type, "postgresql");
    assert_eq!(
        config.connection_string,
        "host=127.0.0.1 user=u password=a;b,c dbname=shop port=5432"
    );
    assert_eq!(config.database_name, "shop");
    assert_eq!(config.pool_max_size, 9);
}

#[test]
fn test_required_keys_and_sizes() {
    assert!(matches!(
        DatabaseConfig::parse("k", "ConnectionString=a.db"),
        Err(DbError::Configuration { .. })
    ));
    assert!(matches!(
        DatabaseConfig::parse("k", "DataType=sqlite"),
        Err(DbError::Configuration { .. })
    ));
    assert!(matches!(
        DatabaseConfig::parse("k", "DataType=sqlite,PoolMaxSize=-1,ConnectionString=a.db"),
        Err(DbError::Configuration { .. })
    ));
}

#[test]
fn test_pool_settings_from_config() {
    let config = DatabaseConfig::parse(
        "k",
        "DataType=mysql,PoolMaxSize=30,PoolMinSize=20,ConnectionString=u:p@tcp(h:3306)/db",
    )
    .unwrap();
    let settings = PoolSettings::from_config(&config);
    assert_eq!(settings.max_open, Some(30));
    assert_eq!(settings.max_idle, Some(10));
    assert_eq!(settings.min_idle, 10);
    assert_eq!(settings.max_lifetime, Duration::from_secs(3600));

    let small = DatabaseConfig::parse(
        "k",
        "DataType=mysql,PoolMaxSize=2,ConnectionString=u:p@tcp(h:3306)/db",
    )
    .unwrap();
    assert_eq!(PoolSettings::from_config(&small).max_idle, Some(1));
}

#[test]
fn test_cli_database_entries() {
    let config = Config {
        databases: vec![
            "main=DataType=sqlite,ConnectionString=data/main.db".to_string(),
            "DataType=mysql,ConnectionString=root:pw@tcp(127.0.0.1:3306)/sales".to_string(),
            "DataType=sqlite,ConnectionString=:memory:".to_string(),
        ],
        ..Config::default()
    };
    let entries = config.parse_databases().unwrap();
    let keys: Vec<&str> = entries.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["main", "sales", ":memory:"]);
    assert_eq!(entries[0].1, "DataType=sqlite,ConnectionString=data/main.db");
    assert_eq!(config.timeout_duration(), Duration::from_secs(10));
}

#[test]
fn test_create_connection_string_round_trips() {
    let conn = create_connection_string("mysql", "10.0.0.1", 3306, "shop", "root", "pw").unwrap();
    let config = DatabaseConfig::parse("shop", &conn).unwrap();
    assert_eq!(config.data_type, "mysql");
    assert_eq!(config.database_name, "shop");
    assert_eq!(config.pool_max_size, 50);

    let conn =
        create_connection_string("postgresql", "10.0.0.2", 5432, "shop", "u", "pw").unwrap();
    assert_eq!(DatabaseConfig::parse("pg", &conn).unwrap().database_name, "shop");

    assert!(create_connection_string("oracle", "h", 1, "d", "u", "p").is_none());
}

#[test]
fn test_password_masking() {
    assert_eq!(
        mask_password("root:secret@tcp(127.0.0.1:3306)/db"),
        "root:***@tcp(127.0.0.1:3306)/db"
    );
    assert_eq!(
        mask_password("host=h user=u password=secret dbname=d"),
        "host=h user=u password=*** dbname=d"
    );
    let config =
        DatabaseConfig::parse("k", "DataType=postgresql,ConnectionString=postgres://u:secret@h/db")
            .unwrap();
    assert!(!format!("{:?}", config).contains("secret"));
}
