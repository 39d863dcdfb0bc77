//! Loyalty Server
//!
//! Accepts purchase order numbers from users, reconciles them against an
//! external accrual system, and keeps a points balance users can spend.

mod api;
mod config;
mod password;
mod server;
mod shutdown;
mod state;
mod supervisor;

use clap::{Parser, ValueEnum};
use config::{ConfigLoader, Overrides};
use loyalty_core::accrual::{HttpAccrualOracle, RetryPolicy};
use loyalty_core::framework::DatabaseProcessor;
use loyalty_core::ledger::LedgerStore;
use loyalty_sdk::signature::SessionSigner;
use server::{build_router, run_server};
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use supervisor::Supervisor;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Loyalty points service with accrual reconciliation
#[derive(Parser, Debug)]
#[command(name = "loyalty-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Address to listen on (e.g., localhost:8080)
    #[arg(short = 'a', long = "address", env = "RUN_ADDRESS")]
    address: Option<String>,

    /// Postgres connection string
    #[arg(short = 'd', long = "database-uri", env = "DATABASE_URI")]
    database_uri: Option<String>,

    /// Base address of the accrual system
    #[arg(short = 'r', long = "accrual-address", env = "ACCRUAL_SYSTEM_ADDRESS")]
    accrual_address: Option<String>,

    /// Log level used when RUST_LOG is not set
    #[arg(short = 'l', long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Optional path to a TOML configuration file
    #[arg(short, long, env = "LOYALTY_CONFIG")]
    config: Option<PathBuf>,

    /// Run database migrations on startup
    #[arg(long, default_value = "false")]
    migrate: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            listen: self.address.clone(),
            database_url: self.database_uri.clone(),
            accrual_address: self.accrual_address.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level, args.log_format);

    tracing::info!("Starting loyalty-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ConfigLoader::new(args.config.as_ref(), args.overrides())
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;

    // Create database connection pool
    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    // Run migrations if requested
    if args.migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    let ledger: Arc<dyn LedgerStore> = Arc::new(DatabaseProcessor {
        pool: db_pool.clone(),
    });
    let oracle = Arc::new(HttpAccrualOracle::new(&config.accrual)?);

    let signer = match &config.session_secret {
        Some(secret) => SessionSigner::new(secret),
        None => {
            tracing::warn!("No session secret configured; sessions will not survive a restart");
            SessionSigner::new(&rand::random::<[u8; 32]>())
        }
    };

    // Start background reconciliation
    let supervisor = Supervisor::start(
        ledger.clone(),
        oracle,
        config.reconciler.clone(),
        config.recovery.clone(),
        RetryPolicy::new(config.accrual.retry_delays.clone()),
    )
    .await;

    // Build the router and run the server
    let router = build_router(AppState::new(ledger, signer));
    tracing::info!("Starting HTTP server on {}", config.listen);
    let result = run_server(router, &config.listen).await;

    // Stop background tasks
    tracing::info!("Stopping background tasks...");
    supervisor.shutdown(config.shutdown_grace).await;

    // Close database connections gracefully
    tracing::info!("Closing database connections...");
    db_pool.close().await;
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},sqlx=warn,tower_http=debug")));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}
