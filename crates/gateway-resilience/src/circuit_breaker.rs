//! Per-provider circuit breaker and rolling health statistics.
//!
//! The breaker has two stored states, closed and open. An open breaker whose
//! cooldown has elapsed admits a single trial attempt (reported as
//! [`CircuitState::HalfOpen`]); the trial's outcome either closes the breaker
//! or re-opens it with a fresh cooldown.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Weight given to a new latency sample in the moving average
pub const LATENCY_EWMA_ALPHA: f64 = 0.2;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the cooldown elapses
    Open,
    /// Cooldown elapsed; one trial request may pass
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// How long an open circuit rejects requests
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(10 * 60),
        }
    }
}

impl CircuitBreakerConfig {
    fn cooldown_delta(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cooldown).unwrap_or_else(|_| chrono::Duration::days(365))
    }
}

/// Health record for a single provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderHealth {
    /// Provider identifier
    pub provider_id: String,
    /// Time of the last successful call
    pub last_success: Option<DateTime<Utc>>,
    /// Time of the last failed call
    pub last_failure: Option<DateTime<Utc>>,
    /// Failures since the last success
    pub consecutive_failures: u32,
    /// Whether the breaker is open
    pub circuit_open: bool,
    /// When an open breaker admits a trial
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Exponentially weighted latency in milliseconds; `None` until sampled
    pub avg_latency_ms: Option<f64>,
    /// Calls reported, successful or not
    pub total_requests: u64,
    /// Decayed success rate in `[0, 1]`
    pub success_rate: f64,
    #[serde(skip)]
    trial_started: Option<DateTime<Utc>>,
}

impl ProviderHealth {
    /// Neutral record for a provider that has not been called yet
    #[must_use]
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            last_success: None,
            last_failure: None,
            consecutive_failures: 0,
            circuit_open: false,
            cooldown_until: None,
            avg_latency_ms: None,
            total_requests: 0,
            success_rate: 1.0,
            trial_started: None,
        }
    }

    /// Whether the cooldown of an open breaker has elapsed at `now`
    fn cooldown_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.map_or(true, |until| now > until)
    }

    /// Whether the provider may receive traffic at `now`
    #[must_use]
    pub fn is_healthy(&self, now: DateTime<Utc>) -> bool {
        !self.circuit_open || self.cooldown_elapsed(now)
    }

    /// Breaker state at `now`
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> CircuitState {
        match (self.circuit_open, self.cooldown_elapsed(now)) {
            (false, _) => CircuitState::Closed,
            (true, false) => CircuitState::Open,
            (true, true) => CircuitState::HalfOpen,
        }
    }

    /// Claim permission for one attempt.
    ///
    /// A closed breaker always grants. A half-open breaker grants to the first
    /// caller only; the claim expires after one cooldown so an abandoned trial
    /// cannot wedge the provider.
    pub(crate) fn try_acquire(&mut self, now: DateTime<Utc>, config: &CircuitBreakerConfig) -> bool {
        match self.state(now) {
            CircuitState::Closed => true,
            CircuitState::Open => false,
            CircuitState::HalfOpen => {
                let trial_pending = self
                    .trial_started
                    .is_some_and(|started| now <= started + config.cooldown_delta());
                if trial_pending {
                    false
                } else {
                    self.trial_started = Some(now);
                    true
                }
            }
        }
    }

    /// Record a success; returns whether the breaker was open
    pub(crate) fn record_success(&mut self, now: DateTime<Utc>, latency: Duration) -> bool {
        let was_open = self.circuit_open;
        let sample = latency.as_secs_f64() * 1000.0;

        self.total_requests += 1;
        self.last_success = Some(now);
        self.consecutive_failures = 0;
        self.circuit_open = false;
        self.cooldown_until = None;
        self.trial_started = None;
        self.avg_latency_ms = Some(match self.avg_latency_ms {
            Some(avg) => LATENCY_EWMA_ALPHA.mul_add(sample, (1.0 - LATENCY_EWMA_ALPHA) * avg),
            None => sample,
        });
        self.success_rate = decay(self.success_rate, 1.0);

        was_open
    }

    /// Record a failure; returns whether this failure opened (or re-opened)
    /// the breaker
    pub(crate) fn record_failure(
        &mut self,
        now: DateTime<Utc>,
        critical: bool,
        config: &CircuitBreakerConfig,
    ) -> bool {
        let was_open = self.circuit_open;
        self.total_requests += 1;
        self.last_failure = Some(now);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.success_rate = decay(self.success_rate, 0.0);
        self.trial_started = None;

        let trips = critical || was_open || self.consecutive_failures >= config.failure_threshold;
        if trips {
            self.circuit_open = true;
            self.cooldown_until = Some(
                now.checked_add_signed(config.cooldown_delta())
                    .unwrap_or(DateTime::<Utc>::MAX_UTC),
            );
        }
        trips
    }
}

fn decay(rate: f64, outcome: f64) -> f64 {
    rate.mul_add(9.0, outcome) / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_initial_state_is_neutral() {
        let health = ProviderHealth::new("p");
        let now = Utc::now();
        assert!(health.is_healthy(now));
        assert_eq!(health.state(now), CircuitState::Closed);
        assert!((health.success_rate - 1.0).abs() < f64::EPSILON);
        assert!(health.avg_latency_ms.is_none());
    }

    #[test]
    fn test_opens_after_threshold() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();

        assert!(!health.record_failure(now, false, &config()));
        assert!(!health.record_failure(now, false, &config()));
        assert_eq!(health.state(now), CircuitState::Closed);

        assert!(health.record_failure(now, false, &config()));
        assert!(health.circuit_open);
        assert!(!health.is_healthy(now));
        assert!(health.cooldown_until.expect("cooldown set") > health.last_failure.expect("failure"));
    }

    #[test]
    fn test_critical_failure_opens_immediately() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        assert!(health.record_failure(now, true, &config()));
        assert_eq!(health.consecutive_failures, 1);
        assert_eq!(health.state(now), CircuitState::Open);
    }

    #[test]
    fn test_half_open_after_cooldown() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_failure(now, true, &config());

        let later = now + chrono::Duration::seconds(61);
        assert!(health.is_healthy(later));
        assert_eq!(health.state(later), CircuitState::HalfOpen);
    }

    #[test]
    fn test_half_open_admits_single_trial() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_failure(now, true, &config());

        let later = now + chrono::Duration::seconds(61);
        assert!(health.try_acquire(later, &config()));
        assert!(!health.try_acquire(later, &config()));

        // An abandoned trial expires after another cooldown
        let much_later = later + chrono::Duration::seconds(61);
        assert!(health.try_acquire(much_later, &config()));
    }

    #[test]
    fn test_trial_failure_reopens_with_fresh_cooldown() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_failure(now, true, &config());

        let later = now + chrono::Duration::seconds(61);
        assert!(health.try_acquire(later, &config()));
        assert!(health.record_failure(later, false, &config()));
        assert_eq!(health.state(later), CircuitState::Open);
        assert!(health.cooldown_until.expect("cooldown") > later);
    }

    #[test]
    fn test_trial_failure_after_critical_open_blocks_further_trials() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_failure(now, true, &config());

        let later = now + chrono::Duration::seconds(61);
        assert!(health.try_acquire(later, &config()));
        assert!(health.record_failure(later, false, &config()));
        assert_eq!(health.consecutive_failures, 2);
        assert!(!health.try_acquire(later, &config()));
        assert!(!health.is_healthy(later + chrono::Duration::seconds(30)));
    }

    #[test]
    fn test_success_closes_and_resets() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        for _ in 0..5 {
            health.record_failure(now, false, &config());
        }
        assert!(health.record_success(now, Duration::from_millis(200)));
        assert_eq!(health.consecutive_failures, 0);
        assert!(!health.circuit_open);
        assert!(health.cooldown_until.is_none());
        assert_eq!(health.total_requests, 6);
    }

    #[test]
    fn test_latency_ewma() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_success(now, Duration::from_millis(1000));
        assert!((health.avg_latency_ms.expect("sampled") - 1000.0).abs() < 1e-9);

        health.record_success(now, Duration::from_millis(2000));
        // 0.2 * 2000 + 0.8 * 1000
        assert!((health.avg_latency_ms.expect("sampled") - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_failure_keeps_latency_history() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_success(now, Duration::from_millis(500));
        health.record_failure(now, false, &config());
        assert!((health.avg_latency_ms.expect("sampled") - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_success_rate_decay() {
        let mut health = ProviderHealth::new("p");
        let now = Utc::now();
        health.record_failure(now, false, &config());
        assert!((health.success_rate - 0.9).abs() < 1e-9);
        health.record_failure(now, false, &config());
        assert!((health.success_rate - 0.81).abs() < 1e-9);
        health.record_success(now, Duration::from_millis(10));
        assert!((health.success_rate - 0.829).abs() < 1e-9);
    }
}
