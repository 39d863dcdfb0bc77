//! Lifecycle of the background reconciliation tasks.
//!
//! Startup frees claims left by crashed instances before the reconciler
//! claims anything. Shutdown flips the run signal and waits, within a grace
//! period, for the reconciler to release its claims.

use loyalty_core::accrual::{AccrualOracle, RetryPolicy};
use loyalty_core::config::{CrashRecoveryConfig, ReconcilerConfig};
use loyalty_core::ledger::LedgerStore;
use loyalty_core::processors::{CrashRecovery, Reconciler};
use loyalty_core::utils::ClaimOwner;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct Supervisor {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl Supervisor {
    /// Run startup recovery, then spawn the reconciler and the recovery loop.
    pub async fn start(
        ledger: Arc<dyn LedgerStore>,
        oracle: Arc<dyn AccrualOracle>,
        reconciler_config: ReconcilerConfig,
        recovery_config: CrashRecoveryConfig,
        retry: RetryPolicy,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let recovery = CrashRecovery::new(ledger.clone(), recovery_config);
        match recovery.recover_once().await {
            Ok(recovered) => tracing::info!(recovered, "Startup claim recovery finished"),
            Err(e) => tracing::warn!(error = %e, "Startup claim recovery failed"),
        }

        let owner = ClaimOwner::generate();
        tracing::info!(%owner, "Claim owner for this instance");
        let reconciler = Reconciler::new(ledger, oracle, owner, reconciler_config, retry);

        let tasks = vec![
            ("reconciler", tokio::spawn(reconciler.run(shutdown_rx.clone()))),
            ("crash-recovery", tokio::spawn(recovery.run(shutdown_rx))),
        ];

        Self { shutdown_tx, tasks }
    }

    /// Signal every task to stop and wait up to `grace` for them.
    pub async fn shutdown(self, grace: Duration) {
        let _ = self.shutdown_tx.send(true);

        let wait_all = async {
            for (name, handle) in self.tasks {
                if let Err(e) = handle.await {
                    tracing::error!(task = name, error = %e, "Background task failed");
                }
            }
        };
        if tokio::time::timeout(grace, wait_all).await.is_err() {
            tracing::warn!(?grace, "Background tasks did not stop within the grace period");
        }
    }
}
