use super::{AccrualError, AccrualOracle, AccrualResponse};
use crate::config::DEFAULT_RETRY_DELAYS;
use crate::utils::shutdown_requested;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

/// Bounded attempt schedule of one resolve call.
///
/// `delays[i]` is the wait after attempt `i + 1`. The schedule length is
/// the attempt budget, so the final entry is never slept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// An empty schedule still allows a single attempt.
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            return Self {
                delays: vec![Duration::ZERO],
            };
        }
        Self { delays }
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    /// Wait before the attempt following `attempt` (1-based), if one follows.
    fn delay_after(&self, attempt: usize) -> Option<Duration> {
        if attempt < self.delays.len() {
            self.delays.get(attempt - 1).copied()
        } else {
            None
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRY_DELAYS.to_vec())
    }
}

/// Ask `oracle` about `order_id`, retrying transient failures.
///
/// Rate limiting, server errors and timeouts are retried after the
/// scheduled delay; every other failure is returned at once. Both the
/// request and the wait give way to shutdown, which yields
/// [`AccrualError::Aborted`].
pub async fn resolve(
    oracle: &dyn AccrualOracle,
    policy: &RetryPolicy,
    order_id: &str,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> Result<AccrualResponse, AccrualError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let outcome = tokio::select! {
            biased;
            _ = shutdown_requested(shutdown_rx) => return Err(AccrualError::Aborted),
            outcome = oracle.fetch(order_id) => outcome,
        };
        let err = match outcome {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };

        let Some(delay) = policy.delay_after(attempt) else {
            return Err(err);
        };
        if !err.is_retryable() {
            return Err(err);
        }
        debug!(order_id, attempt, error = %err, ?delay, "Retrying accrual lookup");

        tokio::select! {
            biased;
            _ = shutdown_requested(shutdown_rx) => return Err(AccrualError::Aborted),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::AccrualStatus;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    struct ScriptedOracle {
        script: Mutex<VecDeque<Result<AccrualResponse, AccrualError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn new(script: Vec<Result<AccrualResponse, AccrualError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AccrualOracle for ScriptedOracle {
        async fn fetch(&self, _order_id: &str) -> Result<AccrualResponse, AccrualError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(outcome) => outcome,
                None => std::future::pending().await,
            }
        }
    }

    fn processed() -> Result<AccrualResponse, AccrualError> {
        Ok(AccrualResponse {
            order: "12345678903".to_string(),
            status: AccrualStatus::Processed,
            accrual: Some(rust_decimal::Decimal::from(500)),
        })
    }

    #[test]
    fn test_policy_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 3);
        assert_eq!(policy.delay_after(1), Some(Duration::from_millis(1500)));
        assert_eq!(policy.delay_after(2), Some(Duration::from_millis(3000)));
        assert_eq!(policy.delay_after(3), None);

        let single = RetryPolicy::new(Vec::new());
        assert_eq!(single.attempts(), 1);
        assert_eq!(single.delay_after(1), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success() {
        let oracle = ScriptedOracle::new(vec![
            Err(AccrualError::RateLimited),
            Err(AccrualError::RateLimited),
            processed(),
        ]);
        let (_tx, mut rx) = watch::channel(false);
        let started = Instant::now();

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, processed());
        assert_eq!(oracle.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_content_is_not_retried() {
        let oracle = ScriptedOracle::new(vec![Err(AccrualError::NoContent), processed()]);
        let (_tx, mut rx) = watch::channel(false);
        let started = Instant::now();

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, Err(AccrualError::NoContent));
        assert_eq!(oracle.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_is_bounded() {
        let oracle = ScriptedOracle::new(vec![
            Err(AccrualError::ServerError),
            Err(AccrualError::Timeout),
            Err(AccrualError::ServerError),
            processed(),
        ]);
        let (_tx, mut rx) = watch::channel(false);
        let started = Instant::now();

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, Err(AccrualError::ServerError));
        assert_eq!(oracle.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_millis(4500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_after_retry() {
        let oracle = ScriptedOracle::new(vec![
            Err(AccrualError::Timeout),
            Err(AccrualError::Other { status: 404 }),
        ]);
        let (_tx, mut rx) = watch::channel(false);
        let started = Instant::now();

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, Err(AccrualError::Other { status: 404 }));
        assert_eq!(oracle.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_backoff() {
        let oracle = ScriptedOracle::new(vec![Err(AccrualError::RateLimited), processed()]);
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let _ = tx.send(true);
        });
        let started = Instant::now();

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, Err(AccrualError::Aborted));
        assert_eq!(oracle.calls(), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_request() {
        let oracle = ScriptedOracle::new(Vec::new());
        let (tx, mut rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            let _ = tx.send(true);
        });

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, Err(AccrualError::Aborted));
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_attempt_after_shutdown() {
        let oracle = ScriptedOracle::new(vec![processed()]);
        let (tx, mut rx) = watch::channel(false);
        tx.send(true).unwrap();

        let outcome = resolve(&oracle, &RetryPolicy::default(), "12345678903", &mut rx).await;

        assert_eq!(outcome, Err(AccrualError::Aborted));
        assert_eq!(oracle.calls(), 0);
    }
}
