//! Prometheus metrics for routing decisions.

use crate::error::TelemetryError;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Latency buckets in seconds
const LATENCY_BUCKETS: &[f64] = &[0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Final outcome of a routed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// A provider answered
    Success,
    /// Deferred to the batch queue
    Batched,
    /// Every candidate failed
    Failsafe,
    /// Rejected before routing
    Rejected,
}

impl RouteOutcome {
    /// Label value
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Batched => "batched",
            Self::Failsafe => "failsafe",
            Self::Rejected => "rejected",
        }
    }
}

/// Routing metrics on a dedicated registry
#[derive(Debug, Clone)]
pub struct RoutingMetrics {
    registry: Registry,
    routed_requests: IntCounterVec,
    provider_attempts: IntCounterVec,
    provider_latency: HistogramVec,
}

impl RoutingMetrics {
    /// Create and register the metrics
    ///
    /// # Errors
    /// Returns error if a metric cannot be registered
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new_custom(Some("task_gateway".to_string()), None)?;

        let routed_requests = IntCounterVec::new(
            Opts::new("routed_requests_total", "Requests routed, by final outcome"),
            &["outcome"],
        )?;
        let provider_attempts = IntCounterVec::new(
            Opts::new("provider_attempts_total", "Provider attempts, by provider and outcome"),
            &["provider", "outcome"],
        )?;
        let provider_latency = HistogramVec::new(
            HistogramOpts::new("provider_latency_seconds", "Latency of successful provider attempts")
                .buckets(LATENCY_BUCKETS.to_vec()),
            &["provider"],
        )?;

        registry.register(Box::new(routed_requests.clone()))?;
        registry.register(Box::new(provider_attempts.clone()))?;
        registry.register(Box::new(provider_latency.clone()))?;

        Ok(Self {
            registry,
            routed_requests,
            provider_attempts,
            provider_latency,
        })
    }

    /// Count a routed request
    pub fn record_route(&self, outcome: RouteOutcome) {
        self.routed_requests.with_label_values(&[outcome.as_str()]).inc();
    }

    /// Count a successful attempt and observe its latency
    pub fn record_attempt_success(&self, provider: &str, latency: Duration) {
        self.provider_attempts
            .with_label_values(&[provider, "success"])
            .inc();
        self.provider_latency
            .with_label_values(&[provider])
            .observe(latency.as_secs_f64());
    }

    /// Count a failed attempt under its error kind
    pub fn record_attempt_failure(&self, provider: &str, error_kind: &str) {
        self.provider_attempts
            .with_label_values(&[provider, error_kind])
            .inc();
    }

    /// Routed requests with the given outcome
    #[must_use]
    pub fn routed_count(&self, outcome: RouteOutcome) -> u64 {
        self.routed_requests.with_label_values(&[outcome.as_str()]).get()
    }

    /// Attempts against a provider with the given outcome label
    #[must_use]
    pub fn attempt_count(&self, provider: &str, outcome: &str) -> u64 {
        self.provider_attempts
            .with_label_values(&[provider, outcome])
            .get()
    }

    /// Underlying registry
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn encode(&self) -> Result<String, TelemetryError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encode(e.to_string()))
    }
}
