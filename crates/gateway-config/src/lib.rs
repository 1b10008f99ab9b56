//! # Gateway Config
//!
//! Configuration management for the Task Gateway.
//!
//! Configuration is read from a YAML, TOML or JSON file (chosen by extension),
//! overlaid with `TASK_GATEWAY_*` environment variables and validated before
//! use.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    default_providers, AdapterConfig, BatchSettings, CircuitBreakerSettings, GatewayConfig,
    JobStoreSettings, ProviderConfig, RoutingSettings, ScoringSettings, TelemetrySettings,
    TimeoutConfig, PROMPT_PLACEHOLDER, WEIGHT_SUM_TOLERANCE,
};
pub use error::ConfigError;
pub use loader::{load_config, load_config_from_path, parse_config, CONFIG_PATH_ENV, ENV_PREFIX};
