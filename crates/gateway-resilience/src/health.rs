//! Health tracker keyed by provider id.
//!
//! Records are created lazily and mutated only through [`HealthTracker::report_success`]
//! and [`HealthTracker::report_failure`]. Each record sits behind its map
//! shard's lock, so concurrent reports for the same provider never lose
//! updates.

use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState, ProviderHealth};
use crate::clock::{Clock, SystemClock};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Tracks health and circuit breaker state for every provider
#[derive(Debug)]
pub struct HealthTracker {
    config: CircuitBreakerConfig,
    records: DashMap<String, ProviderHealth>,
    clock: Arc<dyn Clock>,
}

impl HealthTracker {
    /// Create a tracker using the system clock
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with default breaker settings
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Create a tracker with an explicit clock
    #[must_use]
    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            records: DashMap::new(),
            clock,
        }
    }

    /// Breaker configuration
    #[must_use]
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Record a successful call and its latency
    pub fn report_success(&self, provider_id: &str, latency: Duration) {
        let now = self.clock.now();
        let mut record = self
            .records
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(provider_id));

        if record.record_success(now, latency) {
            info!(provider = %provider_id, "Circuit breaker closed");
        }
        debug!(
            provider = %provider_id,
            latency_ms = latency.as_millis() as u64,
            success_rate = record.success_rate,
            "Provider success recorded"
        );
    }

    /// Record a failed call.
    ///
    /// `critical` failures (rejected credentials) open the breaker at once
    /// regardless of the threshold.
    pub fn report_failure(&self, provider_id: &str, critical: bool) {
        let now = self.clock.now();
        let mut record = self
            .records
            .entry(provider_id.to_string())
            .or_insert_with(|| ProviderHealth::new(provider_id));

        if record.record_failure(now, critical, &self.config) {
            warn!(
                provider = %provider_id,
                consecutive_failures = record.consecutive_failures,
                critical = critical,
                cooldown_secs = self.config.cooldown.as_secs(),
                "Circuit breaker opened"
            );
        } else {
            debug!(
                provider = %provider_id,
                consecutive_failures = record.consecutive_failures,
                "Provider failure recorded"
            );
        }
    }

    /// Whether the provider may receive traffic.
    ///
    /// An open breaker becomes eligible again once its cooldown has passed;
    /// the check is evaluated lazily, there is no background timer.
    #[must_use]
    pub fn is_healthy(&self, provider_id: &str) -> bool {
        let now = self.clock.now();
        self.records
            .get(provider_id)
            .map_or(true, |record| record.is_healthy(now))
    }

    /// Claim one attempt against the provider.
    ///
    /// Same as [`is_healthy`](Self::is_healthy) for closed breakers, but a
    /// half-open breaker lets only one concurrent trial through.
    pub fn try_acquire(&self, provider_id: &str) -> bool {
        let now = self.clock.now();
        match self.records.get_mut(provider_id) {
            Some(mut record) => record.try_acquire(now, &self.config),
            None => true,
        }
    }

    /// Breaker state of a provider
    #[must_use]
    pub fn state(&self, provider_id: &str) -> CircuitState {
        let now = self.clock.now();
        self.records
            .get(provider_id)
            .map_or(CircuitState::Closed, |record| record.state(now))
    }

    /// Copy of a provider's record; neutral if never reported
    #[must_use]
    pub fn snapshot(&self, provider_id: &str) -> ProviderHealth {
        self.records
            .get(provider_id)
            .map_or_else(|| ProviderHealth::new(provider_id), |record| record.clone())
    }

    /// Copies of all records, ordered by provider id
    #[must_use]
    pub fn snapshot_all(&self) -> Vec<ProviderHealth> {
        let mut records: Vec<ProviderHealth> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        records.sort_by(|a, b| a.provider_id.cmp(&b.provider_id));
        records
    }

    /// Restore a provider to neutral defaults
    pub fn reset(&self, provider_id: &str) {
        if self.records.remove(provider_id).is_some() {
            info!(provider = %provider_id, "Provider health reset");
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn tracker() -> (HealthTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let tracker = HealthTracker::with_clock(
            CircuitBreakerConfig {
                failure_threshold: 3,
                cooldown: Duration::from_secs(600),
            },
            clock.clone(),
        );
        (tracker, clock)
    }

    #[test]
    fn test_unknown_provider_is_healthy() {
        let (tracker, _) = tracker();
        assert!(tracker.is_healthy("never-seen"));
        assert_eq!(tracker.state("never-seen"), CircuitState::Closed);
        assert_eq!(tracker.snapshot("never-seen").total_requests, 0);
        assert!(tracker.snapshot_all().is_empty());
    }

    #[test]
    fn test_threshold_failures_open_until_cooldown() {
        let (tracker, clock) = tracker();
        for _ in 0..3 {
            tracker.report_failure("p", false);
        }
        assert!(!tracker.is_healthy("p"));
        assert_eq!(tracker.state("p"), CircuitState::Open);

        clock.advance(Duration::from_secs(599));
        assert!(!tracker.is_healthy("p"));

        clock.advance(Duration::from_secs(2));
        assert!(tracker.is_healthy("p"));
        assert_eq!(tracker.state("p"), CircuitState::HalfOpen);
    }

    #[test]
    fn test_single_success_closes_breaker() {
        let (tracker, _) = tracker();
        for _ in 0..7 {
            tracker.report_failure("p", false);
        }
        tracker.report_success("p", Duration::from_millis(100));

        let health = tracker.snapshot("p");
        assert_eq!(health.consecutive_failures, 0);
        assert!(!health.circuit_open);
        assert!(tracker.is_healthy("p"));
    }

    #[test]
    fn test_try_acquire_half_open_single_trial() {
        let (tracker, clock) = tracker();
        tracker.report_failure("p", true);
        assert!(!tracker.try_acquire("p"));

        clock.advance(Duration::from_secs(601));
        assert!(tracker.try_acquire("p"));
        assert!(!tracker.try_acquire("p"));
        // Still reported healthy: the trial latch only gates attempts
        assert!(tracker.is_healthy("p"));

        tracker.report_success("p", Duration::from_millis(50));
        assert!(tracker.try_acquire("p"));
        assert!(tracker.try_acquire("p"));
    }

    #[test]
    fn test_reset() {
        let (tracker, _) = tracker();
        tracker.report_failure("p", true);
        tracker.reset("p");
        assert!(tracker.is_healthy("p"));
        assert_eq!(tracker.snapshot("p").total_requests, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reports_are_not_lost() {
        let tracker = Arc::new(HealthTracker::with_defaults());
        let mut handles = Vec::new();
        for i in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    if i % 2 == 0 {
                        tracker.report_success("shared", Duration::from_millis(10));
                    } else {
                        tracker.report_failure("shared", false);
                    }
                }
            }));
        }
        for handle in handles {
            handle.await.expect("task completes");
        }
        assert_eq!(tracker.snapshot("shared").total_requests, 400);
    }
}
