//! Configuration structures.
//!
//! Every option has a default; callers needing different behavior supply
//! overrides through a config file or `TASK_GATEWAY_*` environment variables.

use gateway_core::{Capability, ExecutionContext, ProviderDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Tolerance used when checking that scoring weights sum to one
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Root gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Timeout thresholds
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Circuit breaker settings
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,

    /// Fallback loop settings
    #[serde(default)]
    pub routing: RoutingSettings,

    /// Scoring weights
    #[serde(default)]
    pub scoring: ScoringSettings,

    /// Batch queue settings
    #[serde(default)]
    pub batch: BatchSettings,

    /// Telemetry and logging settings
    #[serde(default)]
    pub telemetry: TelemetrySettings,

    /// Provider catalog
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeouts: TimeoutConfig::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            routing: RoutingSettings::default(),
            scoring: ScoringSettings::default(),
            batch: BatchSettings::default(),
            telemetry: TelemetrySettings::default(),
            providers: default_providers(),
        }
    }
}

impl GatewayConfig {
    /// Validate the configuration
    ///
    /// # Errors
    /// Returns the first invalid setting found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeouts.validate()?;
        self.scoring.validate()?;

        if self.circuit_breaker.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "circuit_breaker.failure_threshold must be at least 1",
            ));
        }
        if self.circuit_breaker.cooldown.is_zero() {
            return Err(ConfigError::invalid("circuit_breaker.cooldown must be non-zero"));
        }
        if self.routing.max_fallback_hops == 0 {
            return Err(ConfigError::invalid(
                "routing.max_fallback_hops must be at least 1",
            ));
        }
        if self.telemetry.capacity == 0 {
            return Err(ConfigError::invalid("telemetry.capacity must be at least 1"));
        }
        if self.batch.max_concurrent_jobs == 0 {
            return Err(ConfigError::invalid(
                "batch.max_concurrent_jobs must be at least 1",
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.validate()?;
            if self.routing.execution_context == ExecutionContext::Untrusted
                && provider.holds_credentials()
            {
                return Err(ConfigError::invalid(format!(
                    "provider {} reads an API key but the gateway runs untrusted; \
                     route it through a trusted_proxy adapter",
                    provider.id
                )));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "duplicate provider id: {}",
                    provider.id
                )));
            }
        }

        Ok(())
    }
}

/// Timeout thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Upper bound of the "realtime" latency class
    #[serde(with = "humantime_serde", default = "default_realtime_timeout")]
    pub realtime: Duration,

    /// Cap on any single provider attempt
    #[serde(with = "humantime_serde", default = "default_complex_timeout")]
    pub complex: Duration,

    /// Profiles tolerating at least this much latency go to the batch queue
    #[serde(with = "humantime_serde", default = "default_batch_timeout")]
    pub batch: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            realtime: default_realtime_timeout(),
            complex: default_complex_timeout(),
            batch: default_batch_timeout(),
        }
    }
}

impl TimeoutConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.realtime.is_zero() || self.complex.is_zero() || self.batch.is_zero() {
            return Err(ConfigError::invalid("timeouts must be non-zero"));
        }
        if self.realtime > self.complex || self.complex > self.batch {
            return Err(ConfigError::invalid(
                "timeouts must satisfy realtime <= complex <= batch",
            ));
        }
        Ok(())
    }
}

fn default_realtime_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_complex_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_batch_timeout() -> Duration {
    Duration::from_secs(300)
}

/// Circuit breaker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures that open the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// How long an open breaker keeps the provider out of rotation
    #[serde(with = "humantime_serde", default = "default_cooldown")]
    pub cooldown: Duration,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown: default_cooldown(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown() -> Duration {
    Duration::from_secs(10 * 60)
}

/// Fallback loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingSettings {
    /// Maximum provider attempts per request
    #[serde(default = "default_max_fallback_hops")]
    pub max_fallback_hops: usize,

    /// Trust level of the running process
    #[serde(default)]
    pub execution_context: ExecutionContext,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            max_fallback_hops: default_max_fallback_hops(),
            execution_context: ExecutionContext::default(),
        }
    }
}

fn default_max_fallback_hops() -> usize {
    3
}

/// Scoring weights; must sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Capability match weight
    #[serde(default = "default_capability_weight")]
    pub capability: f64,
    /// Reliability weight
    #[serde(default = "default_reliability_weight")]
    pub reliability: f64,
    /// Latency weight
    #[serde(default = "default_latency_weight")]
    pub latency: f64,
    /// Cost weight
    #[serde(default = "default_cost_weight")]
    pub cost: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            capability: default_capability_weight(),
            reliability: default_reliability_weight(),
            latency: default_latency_weight(),
            cost: default_cost_weight(),
        }
    }
}

impl ScoringSettings {
    /// Sum of all weights
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.capability + self.reliability + self.latency + self.cost
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let weights = [self.capability, self.reliability, self.latency, self.cost];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::invalid(
                "scoring weights must be finite and non-negative",
            ));
        }
        if (self.sum() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::invalid(format!(
                "scoring weights must sum to 1.0, got {}",
                self.sum()
            )));
        }
        Ok(())
    }
}

fn default_capability_weight() -> f64 {
    0.4
}

fn default_reliability_weight() -> f64 {
    0.3
}

fn default_latency_weight() -> f64 {
    0.2
}

fn default_cost_weight() -> f64 {
    0.1
}

/// Batch queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSettings {
    /// Jobs the external worker may run at once
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// How often the external worker polls for pending jobs
    #[serde(with = "humantime_serde", default = "default_poll_interval")]
    pub poll_interval: Duration,

    /// Where job records are persisted
    #[serde(default)]
    pub store: JobStoreSettings,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: default_max_concurrent_jobs(),
            poll_interval: default_poll_interval(),
            store: JobStoreSettings::default(),
        }
    }
}

fn default_max_concurrent_jobs() -> usize {
    5
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

/// Job record persistence backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobStoreSettings {
    /// Process-local map
    #[default]
    Memory,
    /// One JSON document per job in a directory
    File {
        /// Directory holding job documents
        directory: PathBuf,
    },
}

/// Telemetry and logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySettings {
    /// Ring buffer capacity
    #[serde(default = "default_telemetry_capacity")]
    pub capacity: usize,

    /// Default log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            capacity: default_telemetry_capacity(),
            log_level: default_log_level(),
            json: false,
        }
    }
}

fn default_telemetry_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One provider entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider identifier
    pub id: String,

    /// Display name, defaults to the id
    #[serde(default)]
    pub name: Option<String>,

    /// Cost/trust tier
    #[serde(default)]
    pub layer: u8,

    /// Capabilities offered
    pub capabilities: Vec<Capability>,

    /// Whether the provider starts enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether calls need server-held secrets
    #[serde(default)]
    pub requires_server_side: bool,

    /// Context window in tokens
    #[serde(default)]
    pub max_context: Option<u32>,

    /// Cost per token in USD
    #[serde(default)]
    pub cost_per_token: Option<f64>,

    /// Backend adapter
    pub adapter: AdapterConfig,
}

impl ProviderConfig {
    /// Build the registry descriptor for this provider
    #[must_use]
    pub fn descriptor(&self) -> ProviderDescriptor {
        let mut descriptor = ProviderDescriptor::new(
            &self.id,
            self.name.clone().unwrap_or_else(|| self.id.clone()),
            self.layer,
        )
        .with_capabilities(self.capabilities.iter().copied());

        descriptor.requires_server_side = self.requires_server_side;
        descriptor.max_context = self.max_context;
        descriptor.cost_per_token = self.cost_per_token;
        if !self.enabled {
            descriptor = descriptor.disabled("disabled in configuration");
        }
        descriptor
    }

    /// Whether building this provider's adapter loads a secret into the
    /// gateway process
    #[must_use]
    pub fn holds_credentials(&self) -> bool {
        matches!(
            &self.adapter,
            AdapterConfig::ChatCompletions {
                api_key_env: Some(_),
                ..
            }
        )
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::invalid("provider id cannot be empty"));
        }
        if self.capabilities.is_empty() {
            return Err(ConfigError::invalid(format!(
                "provider {} must declare at least one capability",
                self.id
            )));
        }
        match &self.adapter {
            AdapterConfig::ChatCompletions { base_url, model, .. } => {
                if base_url.is_empty() || model.is_empty() {
                    return Err(ConfigError::invalid(format!(
                        "provider {} needs base_url and model",
                        self.id
                    )));
                }
            }
            AdapterConfig::ImageUrl { url_template, .. } => {
                if !url_template.contains(PROMPT_PLACEHOLDER) {
                    return Err(ConfigError::invalid(format!(
                        "provider {} url_template must contain {PROMPT_PLACEHOLDER}",
                        self.id
                    )));
                }
            }
            AdapterConfig::TrustedProxy { endpoint } => {
                if endpoint.is_empty() {
                    return Err(ConfigError::invalid(format!(
                        "provider {} needs a proxy endpoint",
                        self.id
                    )));
                }
            }
            AdapterConfig::Unimplemented => {}
        }
        Ok(())
    }
}

/// Placeholder replaced by the encoded prompt in image URL templates
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// Backend adapter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterConfig {
    /// OpenAI-compatible chat completions endpoint
    ChatCompletions {
        /// Base URL up to and including the API version segment
        base_url: String,
        /// Model name sent with each request
        model: String,
        /// Environment variable holding the API key
        #[serde(default)]
        api_key_env: Option<String>,
        /// HTTP client timeout
        #[serde(with = "humantime_serde", default = "default_request_timeout")]
        request_timeout: Duration,
    },
    /// Media URL built from a template
    ImageUrl {
        /// Template containing `{prompt}`
        url_template: String,
        /// Probe the URL before returning it
        #[serde(default = "default_true")]
        verify: bool,
    },
    /// Trusted intermediary that holds the provider secrets
    TrustedProxy {
        /// Proxy endpoint receiving task requests
        endpoint: String,
    },
    /// Placeholder with no backend
    Unimplemented,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_true() -> bool {
    true
}

/// Built-in provider catalog used when no `providers` section is given
#[must_use]
pub fn default_providers() -> Vec<ProviderConfig> {
    vec![
        ProviderConfig {
            id: "local-llm".to_string(),
            name: Some("Local LLM (Ollama)".to_string()),
            layer: 0,
            capabilities: vec![Capability::Text, Capability::Reasoning, Capability::Code],
            enabled: true,
            requires_server_side: false,
            max_context: Some(8_192),
            cost_per_token: None,
            adapter: AdapterConfig::ChatCompletions {
                base_url: "http://localhost:11434/v1".to_string(),
                model: "llama3.1".to_string(),
                api_key_env: None,
                request_timeout: default_request_timeout(),
            },
        },
        ProviderConfig {
            id: "pollinations-image".to_string(),
            name: Some("Pollinations Image".to_string()),
            layer: 0,
            capabilities: vec![Capability::Image],
            enabled: true,
            requires_server_side: false,
            max_context: None,
            cost_per_token: None,
            adapter: AdapterConfig::ImageUrl {
                url_template: "https://image.pollinations.ai/prompt/{prompt}".to_string(),
                verify: true,
            },
        },
        ProviderConfig {
            id: "openai".to_string(),
            name: Some("OpenAI".to_string()),
            layer: 2,
            capabilities: vec![Capability::Text, Capability::Reasoning, Capability::Code],
            enabled: true,
            requires_server_side: true,
            max_context: Some(128_000),
            cost_per_token: Some(0.000_000_6),
            adapter: AdapterConfig::ChatCompletions {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key_env: Some("OPENAI_API_KEY".to_string()),
                request_timeout: default_request_timeout(),
            },
        },
        ProviderConfig {
            id: "speech-synth".to_string(),
            name: Some("Speech Synthesis".to_string()),
            layer: 3,
            capabilities: vec![Capability::Audio],
            enabled: true,
            requires_server_side: true,
            max_context: None,
            cost_per_token: None,
            adapter: AdapterConfig::Unimplemented,
        },
        ProviderConfig {
            id: "video-synth".to_string(),
            name: Some("Video Synthesis".to_string()),
            layer: 4,
            capabilities: vec![Capability::Video],
            enabled: true,
            requires_server_side: true,
            max_context: None,
            cost_per_token: None,
            adapter: AdapterConfig::Unimplemented,
        },
    ]
}
