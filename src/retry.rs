//! Bounded retry with a fixed delay, applied at every network boundary.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;

/// Retry policy for network calls: a fixed number of attempts separated by a
/// fixed delay. No backoff growth, no jitter, no circuit breaker.
///
/// The policy applies identically to reads and writes. Writes carry no
/// idempotency key, so a retried create whose first attempt actually landed
/// server-side can leave a duplicate page; reconciliation keyed on the source
/// URL does not heal that automatically.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    /// Runs `op` up to `max_attempts` times, sleeping `delay` between
    /// attempts. The final failure is propagated unchanged.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts => {
                    tracing::warn!(
                        "Attempt {}/{} failed, retrying in {:?}: {}",
                        attempt,
                        self.max_attempts,
                        self.delay,
                        err
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42u32) }
            })
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(SyncError::Api {
                            status: 503,
                            message: "unavailable".into(),
                        })
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_propagates_last_error() {
        let policy = RetryPolicy::immediate(3);
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(SyncError::Api {
                        status: 500,
                        message: "boom".into(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(SyncError::Api { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected Api error, got {:?}", other.map(|_| ())),
        }
    }
}
