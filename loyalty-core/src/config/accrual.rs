//! Accrual oracle client configuration.

use std::time::Duration;
use url::Url;

/// Waits between consecutive attempts of one resolve call.
///
/// The number of entries is the attempt budget; the last wait is never
/// slept because no attempt follows it.
pub const DEFAULT_RETRY_DELAYS: [Duration; 3] = [
    Duration::from_millis(1500),
    Duration::from_millis(3000),
    Duration::ZERO,
];

/// How to reach the accrual oracle.
#[derive(Debug, Clone)]
pub struct AccrualClientConfig {
    /// Base address, e.g. `http://localhost:8081`.
    pub base_url: Url,
    /// Bound on one request, including reading the body.
    pub request_timeout: Duration,
    pub retry_delays: Vec<Duration>,
}

impl AccrualClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            request_timeout: Duration::from_secs(5),
            retry_delays: DEFAULT_RETRY_DELAYS.to_vec(),
        }
    }

    /// Longest time one order can spend being resolved: every attempt runs
    /// into the request timeout and every wait is slept.
    pub fn worst_case_resolve(&self) -> Duration {
        let attempts = u32::try_from(self.retry_delays.len().max(1)).unwrap_or(u32::MAX);
        self.retry_delays
            .iter()
            .fold(self.request_timeout.saturating_mul(attempts), |total, delay| {
                total.saturating_add(*delay)
            })
    }
}
