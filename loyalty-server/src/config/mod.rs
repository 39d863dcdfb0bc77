//! Configuration module for loyalty-server.
//!
//! Handles loading configuration from an optional TOML file and applying
//! command-line / environment overrides on top of it.

pub mod file;

use crate::config::file::FileConfig;
use loyalty_core::config::{AccrualClientConfig, CrashRecoveryConfig, ReconcilerConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("database URI is not set (use -d or DATABASE_URI)")]
    MissingDatabaseUrl,

    #[error("accrual system address is not set (use -r or ACCRUAL_SYSTEM_ADDRESS)")]
    MissingAccrualAddress,

    #[error("invalid accrual system address: {0}")]
    InvalidAccrualAddress(#[from] url::ParseError),
}

/// Values given on the command line or through the environment.
///
/// They take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub listen: Option<String>,
    pub database_url: Option<String>,
    pub accrual_address: Option<String>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub listen: String,
    pub database_url: String,
    pub max_connections: u32,
    pub session_secret: Option<Vec<u8>>,
    pub shutdown_grace: Duration,
    pub accrual: AccrualClientConfig,
    pub reconciler: ReconcilerConfig,
    pub recovery: CrashRecoveryConfig,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    pub fn new(config_path: Option<impl AsRef<Path>>, overrides: Overrides) -> Self {
        Self {
            config_path: config_path.map(|p| p.as_ref().to_path_buf()),
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if one was given
    /// 2. Apply CLI / environment overrides
    /// 3. Validate the result
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let mut file_config = match &self.config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                toml::from_str::<FileConfig>(&content)?
            }
            None => FileConfig::default(),
        };

        if let Some(listen) = &self.overrides.listen {
            file_config.server.listen = listen.clone();
        }
        if let Some(url) = &self.overrides.database_url {
            file_config.database.url = Some(url.clone());
        }
        if let Some(address) = &self.overrides.accrual_address {
            file_config.accrual.address = Some(address.clone());
        }

        self.validate(&file_config)?;
        let config = build_loaded_config(file_config)?;
        validate_timing(&config)?;
        Ok(config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        if config.reconciler.workers == 0 {
            return Err(ConfigError::ValidationError(
                "reconciler.workers must be at least 1".to_string(),
            ));
        }
        if config.reconciler.batch_limit == 0 {
            return Err(ConfigError::ValidationError(
                "reconciler.batch_limit must be at least 1".to_string(),
            ));
        }
        if config.reconciler.tick_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reconciler.tick_secs must be at least 1".to_string(),
            ));
        }
        if config.recovery.period_secs == 0 {
            return Err(ConfigError::ValidationError(
                "recovery.period_secs must be at least 1".to_string(),
            ));
        }
        if config.accrual.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "accrual.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if config.reconciler.release_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "reconciler.release_timeout_secs must be at least 1".to_string(),
            ));
        }
        if config.recovery.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "recovery.timeout_secs must be at least 1".to_string(),
            ));
        }
        if config.accrual.retry_delays_ms.is_empty() {
            return Err(ConfigError::ValidationError(
                "accrual.retry_delays_ms needs at least one entry".to_string(),
            ));
        }
        Ok(())
    }
}

/// Checks that relate timeouts of different components.
///
/// Crash recovery frees any claim older than `stale_after`. A live instance
/// re-claims every tick, so it holds a claim for at most one batch plus one
/// tick; that must stay below `stale_after`. The final claim release at
/// shutdown must fit in the shutdown grace period.
fn validate_timing(config: &LoadedConfig) -> Result<(), ConfigError> {
    let longest_hold = config
        .reconciler
        .worst_case_batch(config.accrual.worst_case_resolve())
        .saturating_add(config.reconciler.tick);
    if config.recovery.stale_after <= longest_hold {
        return Err(ConfigError::ValidationError(format!(
            "recovery.stale_after_secs must exceed the longest claim hold ({longest_hold:?})"
        )));
    }
    if config.shutdown_grace <= config.reconciler.release_timeout {
        return Err(ConfigError::ValidationError(
            "server.shutdown_grace_secs must exceed reconciler.release_timeout_secs".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let database_url = file_config
        .database
        .url
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::MissingDatabaseUrl)?;
    let accrual_address = file_config
        .accrual
        .address
        .filter(|address| !address.is_empty())
        .ok_or(ConfigError::MissingAccrualAddress)?;

    let mut accrual = AccrualClientConfig::new(normalize_accrual_address(&accrual_address)?);
    accrual.request_timeout = Duration::from_secs(file_config.accrual.request_timeout_secs);
    accrual.retry_delays = file_config
        .accrual
        .retry_delays_ms
        .iter()
        .map(|ms| Duration::from_millis(*ms))
        .collect();

    let reconciler = ReconcilerConfig {
        workers: file_config.reconciler.workers,
        batch_limit: file_config.reconciler.batch_limit,
        tick: Duration::from_secs(file_config.reconciler.tick_secs),
        release_timeout: Duration::from_secs(file_config.reconciler.release_timeout_secs),
    };
    let recovery = CrashRecoveryConfig {
        period: Duration::from_secs(file_config.recovery.period_secs),
        stale_after: Duration::from_secs(file_config.recovery.stale_after_secs),
        timeout: Duration::from_secs(file_config.recovery.timeout_secs),
    };

    Ok(LoadedConfig {
        listen: file_config.server.listen,
        database_url,
        max_connections: file_config.database.max_connections,
        session_secret: file_config
            .server
            .session_secret
            .map(String::into_bytes),
        shutdown_grace: Duration::from_secs(file_config.server.shutdown_grace_secs),
        accrual,
        reconciler,
        recovery,
    })
}

/// Parse the accrual system address, assuming `http://` when it has no scheme.
pub fn normalize_accrual_address(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    if raw.contains("://") {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("http://{raw}"))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides() -> Overrides {
        Overrides {
            listen: None,
            database_url: Some("postgres://localhost/loyalty".to_string()),
            accrual_address: Some("localhost:8081".to_string()),
        }
    }

    #[test]
    fn test_flags_alone_are_enough() {
        let config = ConfigLoader::new(None::<PathBuf>, overrides()).load().unwrap();
        assert_eq!(config.listen, "localhost:8080");
        assert_eq!(config.database_url, "postgres://localhost/loyalty");
        assert_eq!(config.accrual.base_url.as_str(), "http://localhost:8081/");
        assert_eq!(config.accrual.retry_delays.len(), 3);
        assert_eq!(config.reconciler.tick, Duration::from_secs(10));
        assert_eq!(config.recovery.stale_after, Duration::from_secs(7200));
        assert_eq!(config.shutdown_grace, Duration::from_secs(15));
        assert!(config.shutdown_grace > config.reconciler.release_timeout);
        assert!(config.session_secret.is_none());
    }

    #[test]
    fn test_missing_database_url() {
        let overrides = Overrides {
            database_url: None,
            ..overrides()
        };
        let err = ConfigLoader::new(None::<PathBuf>, overrides).load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseUrl));
    }

    #[test]
    fn test_missing_accrual_address() {
        let overrides = Overrides {
            accrual_address: Some(String::new()),
            ..overrides()
        };
        let err = ConfigLoader::new(None::<PathBuf>, overrides).load().unwrap_err();
        assert!(matches!(err, ConfigError::MissingAccrualAddress));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let path = std::env::temp_dir().join(format!(
            "loyalty-config-{}.toml",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(
            &path,
            r#"
[server]
listen = "0.0.0.0:9000"
session_secret = "file-secret"

[database]
url = "postgres://file/loyalty"

[reconciler]
workers = 2
"#,
        )
        .unwrap();

        let overrides = Overrides {
            listen: Some("127.0.0.1:7000".to_string()),
            ..overrides()
        };
        let config = ConfigLoader::new(Some(&path), overrides).load();
        std::fs::remove_file(&path).unwrap();
        let config = config.unwrap();

        assert_eq!(config.listen, "127.0.0.1:7000");
        assert_eq!(config.database_url, "postgres://localhost/loyalty");
        assert_eq!(config.reconciler.workers, 2);
        assert_eq!(config.session_secret.as_deref(), Some(b"file-secret".as_slice()));
    }

    fn load_with(content: &str) -> Result<LoadedConfig, ConfigError> {
        let path = std::env::temp_dir().join(format!(
            "loyalty-config-{}.toml",
            uuid::Uuid::new_v4().simple()
        ));
        std::fs::write(&path, content).unwrap();
        let result = ConfigLoader::new(Some(&path), overrides()).load();
        std::fs::remove_file(&path).unwrap();
        result
    }

    #[test]
    fn test_zero_workers_rejected() {
        let result = load_with("[reconciler]\nworkers = 0\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        for content in [
            "[accrual]\nrequest_timeout_secs = 0\n",
            "[reconciler]\nrelease_timeout_secs = 0\n",
            "[recovery]\ntimeout_secs = 0\n",
        ] {
            let result = load_with(content);
            assert!(
                matches!(result, Err(ConfigError::ValidationError(_))),
                "accepted {content:?}"
            );
        }
    }

    #[test]
    fn test_staleness_must_outlast_claim_hold() {
        // 10 rounds of (3 x 5s + 4.5s) plus a 10s tick = 205s
        let result = load_with("[recovery]\nstale_after_secs = 205\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let config = load_with("[recovery]\nstale_after_secs = 206\n").unwrap();
        assert_eq!(config.recovery.stale_after, Duration::from_secs(206));
    }

    #[test]
    fn test_grace_must_outlast_release_timeout() {
        let result = load_with("[server]\nshutdown_grace_secs = 5\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));

        let config = load_with("[server]\nshutdown_grace_secs = 6\n").unwrap();
        assert_eq!(config.shutdown_grace, Duration::from_secs(6));
    }

    #[test]
    fn test_normalize_accrual_address() {
        assert_eq!(
            normalize_accrual_address("localhost:8081").unwrap().as_str(),
            "http://localhost:8081/"
        );
        assert_eq!(
            normalize_accrual_address("https://accrual.example.com").unwrap().as_str(),
            "https://accrual.example.com/"
        );
        assert!(normalize_accrual_address("http://").is_err());
    }
}
