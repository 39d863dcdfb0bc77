//! Runtime configuration types for the reconciliation pipeline.
//!
//! These are validated values with their defaults. Loading them from files,
//! flags and the environment is handled by the server crate.

mod accrual;
mod reconciliation;

pub use accrual::{AccrualClientConfig, DEFAULT_RETRY_DELAYS};
pub use reconciliation::{CrashRecoveryConfig, ReconcilerConfig};
