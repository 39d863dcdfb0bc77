//! Periodic release of claims left behind by crashed instances.
//!
//! A running instance renews nothing: it releases its own claims every
//! poll and on shutdown. Claims older than `stale_after` therefore belong
//! to an instance that died, and any instance may free them.

use crate::config::CrashRecoveryConfig;
use crate::ledger::{LedgerError, LedgerStore};
use crate::utils::shutdown_requested;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{error, info};

pub struct CrashRecovery {
    ledger: Arc<dyn LedgerStore>,
    config: CrashRecoveryConfig,
}

impl CrashRecovery {
    pub fn new(ledger: Arc<dyn LedgerStore>, config: CrashRecoveryConfig) -> Self {
        Self { ledger, config }
    }

    /// One recovery pass, bounded by the configured timeout.
    pub async fn recover_once(&self) -> Result<u64, LedgerError> {
        let recover = self.ledger.recover_crashed_claims(self.config.stale_after);
        match tokio::time::timeout(self.config.timeout, recover).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::TimedOut(self.config.timeout)),
        }
    }

    /// Repeat recovery every period until shutdown.
    ///
    /// The first pass runs one period after start; startup recovery is the
    /// caller's job so it can finish before the reconciler claims anything.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(period = ?self.config.period, "Crash recovery loop started");

        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.config.period, self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => break,

                _ = ticker.tick() => {
                    match self.recover_once().await {
                        Ok(0) => {}
                        Ok(recovered) => info!(recovered, "Recovered claims of crashed instances"),
                        Err(e) => error!(error = %e, "Crash recovery failed"),
                    }
                }
            }
        }

        info!("Crash recovery loop stopped");
    }
}
