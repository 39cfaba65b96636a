//! Connectivity checks and per-context health probes.

mod common;

use common::{SlowDriver, config_string};
use db_context::db::{ConnectionChecker, DataModule, DriverRegistry};
use db_context::error::DbError;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_check_sqlite_file() {
    let dir = tempfile::tempdir().unwrap();
    let checker = ConnectionChecker::new(Arc::new(DriverRegistry::with_defaults()));
    assert!(checker.check(&config_string(&dir)).await.unwrap());
    assert!(dir.path().join("test.db").exists());
}

#[tokio::test]
async fn test_check_reports_configuration_errors() {
    let checker = ConnectionChecker::new(Arc::new(DriverRegistry::with_defaults()));

    let err = checker.check("  ").await.unwrap_err();
    assert!(matches!(err, DbError::Configuration { .. }));

    let err = checker.check("ConnectionString=x.db").await.unwrap_err();
    assert!(matches!(err, DbError::Configuration { .. }));

    let err = checker
        .check("DataType=oracle,ConnectionString=x")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownDialect { .. }));
}

#[tokio::test]
async fn test_check_unreachable_server() {
    let checker = ConnectionChecker::new(Arc::new(DriverRegistry::with_defaults()));
    let err = checker
        .check_with_timeout(
            "DataType=postgresql,ConnectionString=postgres://u:p@127.0.0.1:1/db",
            Some(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();
    // Refused connections are retried until the deadline
    assert!(err.is_retryable(), "{:?}", err);
}

#[tokio::test]
async fn test_check_with_timeout_expires() {
    let registry = DriverRegistry::new();
    registry.register("slow", Arc::new(SlowDriver(Duration::from_secs(5))));
    let checker = ConnectionChecker::new(Arc::new(registry));

    let err = checker
        .check_with_timeout(
            "DataType=slow,ConnectionString=sqlite::memory:",
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Timeout { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_module_health_checks() {
    let dir = tempfile::tempdir().unwrap();
    let module = DataModule::new();
    module.register("main", &config_string(&dir)).unwrap();

    let checks = module.health_checks();
    assert_eq!(checks.len(), 1);
    let report = checks[0].check().await.unwrap();
    assert!(report.starts_with("Database.main => "), "{}", report);

    module.shutdown().await;
    assert!(module.pools().is_empty());
}
