//! db-context - connectivity and health checks for configured databases.

use clap::Parser;
use db_context::config::Config;
use db_context::db::{Chain, DataModule, HealthCheck};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

fn print_usage() {
    eprintln!("Error: At least one database must be configured.");
    eprintln!();
    eprintln!("Usage: db-context --database <configuration string>");
    eprintln!("       db-context --database <key>=<configuration string>");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  db-context --database 'DataType=sqlite,ConnectionString=data/app.db'");
    eprintln!(
        "  db-context --database 'main=DataType=mysql,ConnectionString=root:pw@tcp(127.0.0.1:3306)/main'"
    );
    eprintln!(
        "  db-context --now --database 'DataType=postgresql,ConnectionString=host=127.0.0.1 user=u password=p dbname=db'"
    );
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_tracing(&config);

    if config.databases.is_empty() {
        print_usage();
        return ExitCode::FAILURE;
    }

    info!("Starting db-context v{}", env!("CARGO_PKG_VERSION"));

    let databases = match config.parse_databases() {
        Ok(databases) => databases,
        Err(e) => {
            error!(error = %e, "Invalid database configuration");
            return ExitCode::FAILURE;
        }
    };

    let module = DataModule::new();
    let checker = module.connection_checker();
    let timeout = Some(config.timeout_duration());
    let mut failed = 0usize;

    for (key, config_string) in &databases {
        if let Err(e) = checker.check_with_timeout(config_string, timeout).await {
            failed += 1;
            println!("Database.{} => FAILED: {}", key, e);
            if let Some(suggestion) = e.suggestion() {
                println!("  hint: {}", suggestion);
            }
            continue;
        }
        println!("Database.{} => OK", key);

        if !config.now && !config.tables {
            continue;
        }
        let context = match module.register(key, config_string) {
            Ok(context) => context,
            Err(e) => {
                failed += 1;
                println!("Database.{} => FAILED: {}", key, e);
                continue;
            }
        };

        if config.now {
            match HealthCheck::new(key.clone(), context.clone()).check().await {
                Ok(report) => println!("{}", report),
                Err(e) => {
                    failed += 1;
                    println!("Database.{} => now query failed: {}", key, e);
                }
            }
        }

        if config.tables {
            match context.get_table_list(&Chain::new(), None).await {
                Ok(tables) => {
                    for table in tables {
                        println!("  {}", table);
                    }
                }
                Err(e) => {
                    failed += 1;
                    println!("Database.{} => table list failed: {}", key, e);
                }
            }
        }
    }

    module.shutdown().await;
    info!(checked = databases.len(), failed, "Checks complete");

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
