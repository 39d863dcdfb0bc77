//! Reconciler processor.
//!
//! The Reconciler is responsible for:
//! - Releasing its own leftover claims before every poll
//! - Claiming a batch of queued orders on a fixed tick
//! - Fanning the batch out to the worker pool and collecting one result
//!   per order
//! - Settling the successful results in a single ledger transaction
//! - Releasing its claims on shutdown so other instances can continue
//!
//! Failed lookups are not settled; their orders stay queued and come back
//! on a later tick.

use crate::accrual::{AccrualOracle, RetryPolicy};
use crate::config::ReconcilerConfig;
use crate::entities::settlement::SettlementSummary;
use crate::events::{
    AccrualRequest, AccrualRequestSender, AccrualResultReceiver, accrual_request_channel,
    accrual_result_channel,
};
use crate::ledger::LedgerStore;
use crate::processors::worker_pool::WorkerPool;
use crate::utils::{ClaimOwner, shutdown_requested};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How one poll ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Nothing was claimable.
    Idle,
    Settled(SettlementSummary),
    /// The batch could not be completed; its claims are released next poll.
    Abandoned,
    /// Shutdown was requested mid-batch.
    Cancelled,
}

pub struct Reconciler {
    ledger: Arc<dyn LedgerStore>,
    oracle: Arc<dyn AccrualOracle>,
    owner: ClaimOwner,
    config: ReconcilerConfig,
    retry: Arc<RetryPolicy>,
}

impl Reconciler {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        oracle: Arc<dyn AccrualOracle>,
        owner: ClaimOwner,
        config: ReconcilerConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            ledger,
            oracle,
            owner,
            config,
            retry: Arc::new(retry),
        }
    }

    pub fn owner(&self) -> &ClaimOwner {
        &self.owner
    }

    /// Run the Reconciler until shutdown is requested.
    ///
    /// The first poll happens immediately. On exit the worker pool is
    /// drained and this instance's claims are released, bounded by the
    /// configured release timeout.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(owner = %self.owner, workers = self.config.workers, "Reconciler started");

        let (request_tx, request_rx) = accrual_request_channel(self.config.batch_limit);
        let (result_tx, mut result_rx) = accrual_result_channel(self.config.batch_limit);
        let pool = WorkerPool::spawn(
            self.config.workers,
            self.oracle.clone(),
            self.retry.clone(),
            request_rx,
            result_tx,
            shutdown_rx.clone(),
        );

        let mut ticker = tokio::time::interval(self.config.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_requested(&mut shutdown_rx) => {
                    info!("Reconciler received shutdown signal");
                    break;
                }

                _ = ticker.tick() => {
                    let outcome = self
                        .poll_once(&request_tx, &mut result_rx, &mut shutdown_rx)
                        .await;
                    if outcome == PollOutcome::Cancelled {
                        info!("Reconciler batch cancelled by shutdown");
                        break;
                    }
                }
            }
        }

        drop(request_tx);
        pool.join().await;
        self.release_own_claims().await;

        info!("Reconciler shutdown complete");
    }

    async fn poll_once(
        &self,
        request_tx: &AccrualRequestSender,
        result_rx: &mut AccrualResultReceiver,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> PollOutcome {
        match self.ledger.release_claims_of(&self.owner).await {
            Ok(0) => {}
            Ok(released) => debug!(released, "Released leftover claims"),
            Err(e) => warn!(error = %e, "Failed to release leftover claims"),
        }

        let claimed = match self
            .ledger
            .claim_orders_for_processing(&self.owner, self.config.batch_limit)
            .await
        {
            Ok(claimed) => claimed,
            Err(e) => {
                error!(error = %e, "Failed to claim orders for processing");
                return PollOutcome::Abandoned;
            }
        };
        if claimed.is_empty() {
            debug!("No orders to reconcile");
            return PollOutcome::Idle;
        }
        debug!(count = claimed.len(), "Claimed orders for reconciliation");

        let mut pending: HashSet<String> = claimed.iter().map(|c| c.order_id.clone()).collect();
        for order in claimed {
            tokio::select! {
                biased;

                _ = shutdown_requested(shutdown_rx) => return PollOutcome::Cancelled,

                sent = request_tx.send(AccrualRequest::from(order)) => {
                    if sent.is_err() {
                        error!("Worker pool is gone; abandoning batch");
                        return PollOutcome::Abandoned;
                    }
                }
            }
        }

        let mut resolved = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let result = tokio::select! {
                biased;

                _ = shutdown_requested(shutdown_rx) => return PollOutcome::Cancelled,

                result = result_rx.recv() => match result {
                    Some(result) => result,
                    None => {
                        error!("Result queue closed; abandoning batch");
                        return PollOutcome::Abandoned;
                    }
                },
            };
            if !pending.remove(&result.order_id) {
                warn!(order_id = %result.order_id, "Discarding result for an order outside this batch");
                continue;
            }
            match result.into_resolved() {
                Ok(accrual) => resolved.push(accrual),
                Err((order_id, e)) => {
                    debug!(%order_id, error = %e, "Order left for a later poll");
                }
            }
        }

        match self.ledger.settle_batch(&self.owner, resolved).await {
            Ok(summary) => {
                info!(
                    processed = summary.processed,
                    invalid = summary.invalid,
                    pending = summary.pending,
                    already_final = summary.already_final,
                    "Settled reconciliation batch"
                );
                PollOutcome::Settled(summary)
            }
            Err(e) => {
                error!(error = %e, "Failed to settle reconciliation batch");
                PollOutcome::Abandoned
            }
        }
    }

    async fn release_own_claims(&self) {
        let release = self.ledger.release_claims_of(&self.owner);
        match tokio::time::timeout(self.config.release_timeout, release).await {
            Ok(Ok(released)) => info!(released, "Released claims on shutdown"),
            Ok(Err(e)) => warn!(error = %e, "Failed to release claims on shutdown"),
            Err(_) => warn!(
                timeout = ?self.config.release_timeout,
                "Timed out releasing claims on shutdown; crash recovery will free them"
            ),
        }
    }
}
