//! Client side of the external accrual oracle.
//!
//! The oracle is asked, per order number, whether the purchase earned
//! points. [`AccrualOracle`] is the seam; [`HttpAccrualOracle`] is the real
//! client and [`resolve`] wraps any oracle with the bounded retry schedule.

mod http;
mod retry;

pub use http::{HttpAccrualOracle, classify_status};
pub use retry::{RetryPolicy, resolve};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported by the oracle for one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// Known to the oracle, not yet evaluated.
    Registered,
    Processing,
    /// No points will ever be granted.
    Invalid,
    /// Final; `accrual` holds the points granted.
    Processed,
}

/// Body of a successful oracle answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
}

/// Why a single oracle lookup produced no usable answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccrualError {
    /// 204: the oracle does not know this order.
    #[error("order is not registered with the accrual system")]
    NoContent,
    /// 429: the oracle asks us to slow down.
    #[error("accrual system is rate limiting")]
    RateLimited,
    /// 500: transient failure on the oracle side.
    #[error("accrual system internal error")]
    ServerError,
    #[error("accrual request timed out")]
    Timeout,
    /// Any other HTTP status.
    #[error("unexpected accrual system status {status}")]
    Other { status: u16 },
    /// A 200 whose body could not be used.
    #[error("malformed accrual response: {0}")]
    Decode(String),
    /// Connection-level failure other than a timeout.
    #[error("accrual transport error: {0}")]
    Transport(String),
    /// Shutdown was requested before an answer arrived.
    #[error("accrual lookup aborted by shutdown")]
    Aborted,
}

impl AccrualError {
    /// Worth another attempt after a delay.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AccrualError::RateLimited | AccrualError::ServerError | AccrualError::Timeout
        )
    }
}

/// Anything that can look up the accrual state of an order number.
#[async_trait]
pub trait AccrualOracle: Send + Sync {
    async fn fetch(&self, order_id: &str) -> Result<AccrualResponse, AccrualError>;
}
