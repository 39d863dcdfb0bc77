//! Messages exchanged between the reconciler and its worker pool.
//!
//! # Flow
//!
//! 1. The reconciler claims a batch and emits one `AccrualRequest` per order
//! 2. A worker resolves it against the oracle and emits one `AccrualResult`
//! 3. The reconciler collects the results of the batch and settles them
//!
//! Both queues are bounded by the batch limit, which gives natural
//! backpressure: the reconciler never has more in flight than one batch.

pub mod channels;
pub mod types;

pub use channels::{
    AccrualRequestReceiver, AccrualRequestSender, AccrualResultReceiver, AccrualResultSender,
    accrual_request_channel, accrual_result_channel,
};

pub use types::{AccrualRequest, AccrualResult};
