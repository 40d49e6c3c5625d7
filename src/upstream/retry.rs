//! Bounded retry policy for upstream calls.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::UpstreamError;

/// How many times to try an upstream call and how long to wait in between.
///
/// Attempts run strictly one after another. The loop stops early on the first
/// success or on an error that [`UpstreamError::is_retryable`] rejects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 3;

    /// `max_attempts` of 0 is treated as 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Duration::ZERO,
        }
    }

    /// Fixed delay between a failed attempt and the next one.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Runs `attempt` (called with the 1-based attempt number) until it
    /// succeeds, fails with a non-retryable error, or attempts run out.
    ///
    /// Exhaustion is reported as [`UpstreamError::Exhausted`] wrapping the
    /// last failure; a non-retryable error is returned unchanged.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, UpstreamError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let mut n = 1;
        loop {
            let err = match attempt(n).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() {
                return Err(err);
            }
            if n >= self.max_attempts {
                return Err(UpstreamError::Exhausted {
                    attempts: n,
                    last: Box::new(err),
                });
            }

            debug!(attempt = n, max_attempts = self.max_attempts, "retrying upstream call");
            if !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff).await;
            }
            n += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> UpstreamError {
        UpstreamError::from_status(500, "boom".into())
    }

    #[tokio::test]
    async fn stops_on_first_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = RetryPolicy::new(3)
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, UpstreamError>("item")
            })
            .await;
        assert_eq!(result.unwrap(), "item");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::new(3)
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(UpstreamError::from_status(404, "not found".into()))
            })
            .await;
        assert!(matches!(result, Err(UpstreamError::Client { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = RetryPolicy::new(4)
            .run(move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;
        match result {
            Err(UpstreamError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, 4);
                assert!(matches!(*last, UpstreamError::Server { status: 500, .. }));
            }
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let result = RetryPolicy::new(3)
            .run(|n| async move { if n < 3 { Err(server_error()) } else { Ok(n) } })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_waits_between_attempts() {
        let start = tokio::time::Instant::now();
        let _: Result<(), _> = RetryPolicy::new(3)
            .with_backoff(Duration::from_millis(250))
            .run(|_| async { Err(server_error()) })
            .await;
        // Two gaps between three attempts.
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_means_one() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
    }
}
