//! Attempt deadlines.
//!
//! Each provider attempt runs under [`run_with_timeout`]. When the deadline
//! elapses the attempt future is dropped, which aborts any in-flight request
//! owned by it.

use gateway_core::{GatewayError, GatewayResult};
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Latency class a task falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyClass {
    /// Interactive work, answered within the realtime bound
    Realtime,
    /// Slower synchronous work
    Complex,
    /// Deferred to the batch queue
    Batch,
}

impl LatencyClass {
    /// Stable name used in response metadata
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::Complex => "complex",
            Self::Batch => "batch",
        }
    }
}

/// Deadline policy derived from the configured timeouts
#[derive(Debug, Clone, Copy)]
pub struct TimeoutPolicy {
    /// Upper bound of the realtime class
    pub realtime: Duration,
    /// Cap on a single attempt
    pub complex: Duration,
    /// Tasks expected to take at least this long are queued
    pub batch: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            realtime: Duration::from_secs(10),
            complex: Duration::from_secs(60),
            batch: Duration::from_secs(300),
        }
    }
}

impl TimeoutPolicy {
    /// Create a policy
    #[must_use]
    pub fn new(realtime: Duration, complex: Duration, batch: Duration) -> Self {
        Self {
            realtime,
            complex,
            batch,
        }
    }

    /// Deadline for one attempt of a task with the given latency budget
    #[must_use]
    pub fn attempt_timeout(&self, max_latency: Duration) -> Duration {
        max_latency.min(self.complex)
    }

    /// Whether a task with the given latency budget goes to the batch queue
    #[must_use]
    pub fn is_batch(&self, max_latency: Duration) -> bool {
        max_latency >= self.batch
    }

    /// Classify a latency budget
    #[must_use]
    pub fn classify(&self, max_latency: Duration) -> LatencyClass {
        if self.is_batch(max_latency) {
            LatencyClass::Batch
        } else if max_latency <= self.realtime {
            LatencyClass::Realtime
        } else {
            LatencyClass::Complex
        }
    }
}

/// Run `fut` with a deadline, converting expiry into a provider timeout error
pub async fn run_with_timeout<T, F>(provider: &str, timeout: Duration, fut: F) -> GatewayResult<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(provider = %provider, timeout_ms = timeout.as_millis() as u64, "Provider attempt timed out");
            Err(GatewayError::timeout(provider, timeout))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::ErrorKind;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_attempt_timeout_capped_by_complex() {
        let policy = TimeoutPolicy::default();
        assert_eq!(
            policy.attempt_timeout(Duration::from_secs(10)),
            Duration::from_secs(10)
        );
        assert_eq!(
            policy.attempt_timeout(Duration::from_secs(120)),
            Duration::from_secs(60)
        );
    }

    #[test]
    fn test_batch_threshold_is_inclusive() {
        let policy = TimeoutPolicy::default();
        assert!(policy.is_batch(Duration::from_millis(300_000)));
        assert!(!policy.is_batch(Duration::from_millis(120_000)));
    }

    #[test]
    fn test_classify() {
        let policy = TimeoutPolicy::default();
        assert_eq!(policy.classify(Duration::from_secs(10)), LatencyClass::Realtime);
        assert_eq!(policy.classify(Duration::from_secs(25)), LatencyClass::Complex);
        assert_eq!(policy.classify(Duration::from_secs(300)), LatencyClass::Batch);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completes_within_deadline() {
        let result = run_with_timeout("p", Duration::from_secs(1), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok::<_, GatewayError>(7)
        })
        .await;
        assert_eq!(result.expect("completes"), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiry_maps_to_timeout_and_drops_future() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let result: GatewayResult<()> = run_with_timeout("slow", Duration::from_secs(1), async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            flag.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        let err = result.expect_err("deadline elapsed");
        assert_eq!(err.kind(), ErrorKind::Timeout);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_inner_error_passes_through() {
        let result: GatewayResult<()> = run_with_timeout("p", Duration::from_secs(1), async {
            Err(GatewayError::offline("p", "connection refused"))
        })
        .await;
        assert_eq!(result.expect_err("inner").kind(), ErrorKind::Offline);
    }
}
