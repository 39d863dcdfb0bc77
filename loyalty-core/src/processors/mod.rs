//! Background processors of the reconciliation pipeline.
//!
//! - `Reconciler`: claims queued orders on a tick, fans them out, settles
//! - `WorkerPool`: resolves `AccrualRequest`s into `AccrualResult`s
//! - `CrashRecovery`: frees claims abandoned by dead instances

pub mod crash_recovery;
pub mod reconciler;
pub mod worker_pool;

pub use crash_recovery::CrashRecovery;
pub use reconciler::{PollOutcome, Reconciler};
pub use worker_pool::WorkerPool;
