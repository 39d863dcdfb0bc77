//! Scheduler, worker pool and crash recovery configuration.

use std::time::Duration;

/// Tuning of one reconciliation run.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Number of concurrent executors querying the oracle.
    pub workers: usize,
    /// Maximum orders claimed per tick; also the capacity of both queues.
    pub batch_limit: usize,
    /// Period between polls.
    pub tick: Duration,
    /// Bound on the best-effort claim release performed at shutdown.
    pub release_timeout: Duration,
}

impl ReconcilerConfig {
    /// Longest time a claimed batch can stay in flight when each order
    /// takes `per_order`. Workers drain the batch in rounds of `workers`.
    pub fn worst_case_batch(&self, per_order: Duration) -> Duration {
        let rounds = self.batch_limit.div_ceil(self.workers.max(1));
        per_order.saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX))
    }
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            batch_limit: 100,
            tick: Duration::from_secs(10),
            release_timeout: Duration::from_secs(5),
        }
    }
}

/// Periodic clearing of claims abandoned by crashed instances.
#[derive(Debug, Clone)]
pub struct CrashRecoveryConfig {
    pub period: Duration,
    /// Claims older than this are cleared regardless of owner.
    pub stale_after: Duration,
    /// Bound on a single recovery attempt.
    pub timeout: Duration,
}

impl Default for CrashRecoveryConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(2 * 60 * 60),
            stale_after: Duration::from_secs(2 * 60 * 60),
            timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worst_case_batch_counts_rounds() {
        let config = ReconcilerConfig::default();
        assert_eq!(
            config.worst_case_batch(Duration::from_secs(2)),
            Duration::from_secs(20)
        );

        let uneven = ReconcilerConfig {
            workers: 3,
            batch_limit: 10,
            ..ReconcilerConfig::default()
        };
        assert_eq!(
            uneven.worst_case_batch(Duration::from_secs(1)),
            Duration::from_secs(4)
        );
    }
}
