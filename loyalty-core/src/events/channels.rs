//! Channel factories and handles for the reconciliation queues.

use super::types::{AccrualRequest, AccrualResult};
use tokio::sync::mpsc;

/// Sender handle for AccrualRequest events.
pub type AccrualRequestSender = mpsc::Sender<AccrualRequest>;
/// Receiver handle for AccrualRequest events.
pub type AccrualRequestReceiver = mpsc::Receiver<AccrualRequest>;

/// Sender handle for AccrualResult events.
pub type AccrualResultSender = mpsc::Sender<AccrualResult>;
/// Receiver handle for AccrualResult events.
pub type AccrualResultReceiver = mpsc::Receiver<AccrualResult>;

/// Create the request queue feeding the worker pool.
///
/// `capacity` is the batch limit; a zero capacity is raised to one.
pub fn accrual_request_channel(capacity: usize) -> (AccrualRequestSender, AccrualRequestReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Create the result queue drained by the reconciler.
pub fn accrual_result_channel(capacity: usize) -> (AccrualResultSender, AccrualResultReceiver) {
    mpsc::channel(capacity.max(1))
}
