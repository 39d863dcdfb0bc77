//! TOML file configuration structures.
//!
//! These structs directly map to the `loyalty-config.toml` file format.
//! Every section and field is optional; missing values take the defaults
//! below.

use serde::{Deserialize, Serialize};

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub accrual: AccrualConfig,
    pub reconciler: ReconcilerConfig,
    pub recovery: RecoveryConfig,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host and port to listen on (e.g., "localhost:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: String,
    /// Key for signing session cookies. A random key is used when absent,
    /// which invalidates sessions on every restart.
    #[serde(default)]
    pub session_secret: Option<String>,
    /// Time background tasks get to stop after the HTTP server has. Must
    /// exceed `reconciler.release_timeout_secs`.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
            session_secret: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

fn default_listen_addr() -> String {
    "localhost:8080".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    15
}

/// Database configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

/// Accrual system section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccrualConfig {
    /// Base address of the accrual system; `http://` is assumed when no
    /// scheme is given.
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Waits between attempts, in milliseconds. The length is the attempt budget.
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,
}

impl Default for AccrualConfig {
    fn default() -> Self {
        Self {
            address: None,
            request_timeout_secs: default_request_timeout_secs(),
            retry_delays_ms: default_retry_delays_ms(),
        }
    }
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_retry_delays_ms() -> Vec<u64> {
    vec![1500, 3000, 0]
}

/// Reconciliation section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_release_timeout_secs")]
    pub release_timeout_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            batch_limit: default_batch_limit(),
            tick_secs: default_tick_secs(),
            release_timeout_secs: default_release_timeout_secs(),
        }
    }
}

fn default_workers() -> usize {
    10
}

fn default_batch_limit() -> usize {
    100
}

fn default_tick_secs() -> u64 {
    10
}

fn default_release_timeout_secs() -> u64 {
    5
}

/// Crash recovery section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_recovery_period_secs")]
    pub period_secs: u64,
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,
    #[serde(default = "default_recovery_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            period_secs: default_recovery_period_secs(),
            stale_after_secs: default_stale_after_secs(),
            timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

fn default_recovery_period_secs() -> u64 {
    2 * 60 * 60
}

fn default_stale_after_secs() -> u64 {
    2 * 60 * 60
}

fn default_recovery_timeout_secs() -> u64 {
    30
}
