//! Provider scoring.
//!
//! Each candidate gets four component scores in `[0, 100]`, combined by a
//! weighted sum whose weights add up to one.

use gateway_config::{ScoringSettings, WEIGHT_SUM_TOLERANCE};
use gateway_core::{Capability, GatewayError, GatewayResult, ProviderDescriptor};
use gateway_resilience::{HealthTracker, ProviderHealth};
use serde::Serialize;

/// Score used when a provider has no latency samples yet
pub const NEUTRAL_LATENCY_SCORE: f64 = 50.0;

/// Component weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoringWeights {
    capability: f64,
    reliability: f64,
    latency: f64,
    cost: f64,
}

impl ScoringWeights {
    /// Create validated weights
    ///
    /// # Errors
    /// Returns a configuration error if a weight is negative or not finite,
    /// or if the weights do not sum to one
    pub fn new(capability: f64, reliability: f64, latency: f64, cost: f64) -> GatewayResult<Self> {
        let weights = [capability, reliability, latency, cost];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(GatewayError::configuration(
                "scoring weights must be finite and non-negative",
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(GatewayError::configuration(format!(
                "scoring weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(Self {
            capability,
            reliability,
            latency,
            cost,
        })
    }

    /// Weights from configuration
    ///
    /// # Errors
    /// Returns a configuration error if the settings are invalid
    pub fn from_settings(settings: &ScoringSettings) -> GatewayResult<Self> {
        Self::new(
            settings.capability,
            settings.reliability,
            settings.latency,
            settings.cost,
        )
    }

    /// Capability weight
    #[must_use]
    pub fn capability(&self) -> f64 {
        self.capability
    }

    /// Reliability weight
    #[must_use]
    pub fn reliability(&self) -> f64 {
        self.reliability
    }

    /// Latency weight
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Cost weight
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.cost
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capability: 0.4,
            reliability: 0.3,
            latency: 0.2,
            cost: 0.1,
        }
    }
}

/// Score of one provider for one task
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderScore {
    /// Provider scored
    pub provider_id: String,
    /// Weighted sum of the components
    pub composite: f64,
    /// Capability component
    pub capability: f64,
    /// Reliability component
    pub reliability: f64,
    /// Latency component
    pub latency: f64,
    /// Cost component
    pub cost: f64,
}

/// Candidate paired with its score
#[derive(Debug, Clone)]
pub struct RankedProvider {
    /// Provider descriptor
    pub descriptor: ProviderDescriptor,
    /// Its score
    pub score: ProviderScore,
}

/// Scores and ranks providers
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    /// Create a scorer
    #[must_use]
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Weights in use
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score one provider
    #[must_use]
    pub fn score(
        &self,
        provider: &ProviderDescriptor,
        health: &ProviderHealth,
        required: Capability,
    ) -> ProviderScore {
        let capability = if provider.supports(required) { 100.0 } else { 0.0 };
        let reliability = reliability_score(health);
        let latency = latency_score(health.avg_latency_ms);
        let cost = cost_score(provider.layer);

        let composite = self.weights.capability.mul_add(
            capability,
            self.weights.reliability.mul_add(
                reliability,
                self.weights.latency.mul_add(latency, self.weights.cost * cost),
            ),
        );

        ProviderScore {
            provider_id: provider.id.clone(),
            composite,
            capability,
            reliability,
            latency,
            cost,
        }
    }

    /// Score candidates and sort them best first.
    ///
    /// The sort is stable, so equal scores keep the input order.
    #[must_use]
    pub fn rank(
        &self,
        candidates: Vec<ProviderDescriptor>,
        health: &HealthTracker,
        required: Capability,
    ) -> Vec<RankedProvider> {
        let mut ranked: Vec<RankedProvider> = candidates
            .into_iter()
            .map(|descriptor| {
                let score = self.score(&descriptor, &health.snapshot(&descriptor.id), required);
                RankedProvider { descriptor, score }
            })
            .collect();
        ranked.sort_by(|a, b| b.score.composite.total_cmp(&a.score.composite));
        ranked
    }
}

fn reliability_score(health: &ProviderHealth) -> f64 {
    if health.circuit_open {
        0.0
    } else {
        (100.0 - 20.0 * f64::from(health.consecutive_failures)).max(0.0)
    }
}

fn latency_score(avg_latency_ms: Option<f64>) -> f64 {
    match avg_latency_ms {
        None => NEUTRAL_LATENCY_SCORE,
        Some(ms) if ms < 1_000.0 => 100.0,
        Some(ms) if ms < 3_000.0 => 80.0,
        Some(ms) if ms < 5_000.0 => 40.0,
        Some(_) => 10.0,
    }
}

fn cost_score(layer: u8) -> f64 {
    match layer {
        0..=1 => 100.0,
        2..=3 => 80.0,
        _ => 50.0,
    }
}
