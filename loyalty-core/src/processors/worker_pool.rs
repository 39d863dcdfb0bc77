//! Fixed-size pool of accrual executors.
//!
//! Workers share one request queue. Every request a worker takes produces
//! exactly one `AccrualResult`, success or failure, so the reconciler can
//! count answers instead of guessing. Workers stop on shutdown or when the
//! request queue is closed.

use crate::accrual::{AccrualOracle, RetryPolicy, resolve};
use crate::events::{AccrualRequest, AccrualRequestReceiver, AccrualResult, AccrualResultSender};
use crate::utils::shutdown_requested;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` executors (at least one).
    pub fn spawn(
        workers: usize,
        oracle: Arc<dyn AccrualOracle>,
        retry: Arc<RetryPolicy>,
        request_rx: AccrualRequestReceiver,
        result_tx: AccrualResultSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        let request_rx = Arc::new(Mutex::new(request_rx));
        let handles = (0..workers.max(1))
            .map(|worker| {
                tokio::spawn(run_worker(
                    worker,
                    oracle.clone(),
                    retry.clone(),
                    request_rx.clone(),
                    result_tx.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every worker to exit.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Accrual worker terminated abnormally");
            }
        }
    }
}

async fn next_request(request_rx: &Mutex<AccrualRequestReceiver>) -> Option<AccrualRequest> {
    request_rx.lock().await.recv().await
}

async fn run_worker(
    worker: usize,
    oracle: Arc<dyn AccrualOracle>,
    retry: Arc<RetryPolicy>,
    request_rx: Arc<Mutex<AccrualRequestReceiver>>,
    result_tx: AccrualResultSender,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(worker, "Accrual worker started");

    loop {
        let request = tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => break,

            request = next_request(&request_rx) => match request {
                Some(request) => request,
                None => break,
            },
        };

        let outcome = resolve(
            oracle.as_ref(),
            &retry,
            &request.order_id,
            &mut shutdown_rx,
        )
        .await;
        if let Err(e) = &outcome {
            debug!(worker, order_id = %request.order_id, error = %e, "Accrual lookup failed");
        }

        let result = AccrualResult::new(request, outcome);
        tokio::select! {
            biased;

            _ = shutdown_requested(&mut shutdown_rx) => break,

            sent = result_tx.send(result) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!(worker, "Accrual worker stopped");
}
