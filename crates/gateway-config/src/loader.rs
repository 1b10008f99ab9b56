//! Loading configuration from files and the environment.

use crate::config::GatewayConfig;
use crate::error::ConfigError;
use gateway_core::ExecutionContext;
use humantime_serde::re::humantime;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "TASK_GATEWAY_";

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV: &str = "TASK_GATEWAY_CONFIG";

/// Load configuration.
///
/// Reads the file named by `TASK_GATEWAY_CONFIG` when set, otherwise starts
/// from defaults, then applies environment overrides and validates.
pub async fn load_config() -> Result<GatewayConfig, ConfigError> {
    let mut config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) if !path.is_empty() => read_config_file(Path::new(&path)).await?,
        _ => {
            debug!("No config file specified, using defaults");
            GatewayConfig::default()
        }
    };

    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit path, apply environment overrides and
/// validate.
pub async fn load_config_from_path(path: impl AsRef<Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = read_config_file(path.as_ref()).await?;
    config.apply_env_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}

async fn read_config_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let config = parse_config(path, &contents)?;
    info!(path = %path.display(), providers = config.providers.len(), "Configuration file loaded");
    Ok(config)
}

/// Parse configuration text, choosing the format from the file extension
pub fn parse_config(path: &Path, contents: &str) -> Result<GatewayConfig, ConfigError> {
    let parse_err = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        Some("toml") => toml::from_str(contents).map_err(|e| parse_err(e.to_string())),
        Some("json") => serde_json::from_str(contents).map_err(|e| parse_err(e.to_string())),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    }
}

impl GatewayConfig {
    /// Apply `TASK_GATEWAY_*` overrides using the given variable lookup.
    ///
    /// Taking the lookup as a closure keeps tests independent of the process
    /// environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| {
            let name = format!("{ENV_PREFIX}{suffix}");
            lookup(&name).map(|value| (name, value))
        };

        if let Some((name, value)) = var("MAX_FALLBACK_HOPS") {
            self.routing.max_fallback_hops = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("EXECUTION_CONTEXT") {
            self.routing.execution_context = match value.to_ascii_lowercase().as_str() {
                "trusted" => ExecutionContext::Trusted,
                "untrusted" => ExecutionContext::Untrusted,
                other => {
                    return Err(ConfigError::Env {
                        var: name,
                        message: format!("expected trusted or untrusted, got {other}"),
                    })
                }
            };
        }
        if let Some((name, value)) = var("FAILURE_THRESHOLD") {
            self.circuit_breaker.failure_threshold = parse_number(&name, &value)?;
        }
        if let Some((name, value)) = var("COOLDOWN") {
            self.circuit_breaker.cooldown = parse_duration(&name, &value)?;
        }
        if let Some((name, value)) = var("REALTIME_TIMEOUT") {
            self.timeouts.realtime = parse_duration(&name, &value)?;
        }
        if let Some((name, value)) = var("COMPLEX_TIMEOUT") {
            self.timeouts.complex = parse_duration(&name, &value)?;
        }
        if let Some((name, value)) = var("BATCH_TIMEOUT") {
            self.timeouts.batch = parse_duration(&name, &value)?;
        }
        if let Some((name, value)) = var("TELEMETRY_CAPACITY") {
            self.telemetry.capacity = parse_number(&name, &value)?;
        }
        if let Some((_, value)) = var("LOG_LEVEL") {
            self.telemetry.log_level = value;
        }
        if let Some((name, value)) = var("LOG_JSON") {
            self.telemetry.json = parse_number(&name, &value)?;
        }
        if let Some((_, value)) = var("BATCH_STORE_DIR") {
            self.batch.store = crate::config::JobStoreSettings::File {
                directory: PathBuf::from(value),
            };
        }

        Ok(())
    }
}

fn parse_number<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: name.to_string(),
        message: e.to_string(),
    })
}

fn parse_duration(name: &str, value: &str) -> Result<std::time::Duration, ConfigError> {
    humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Env {
        var: name.to_string(),
        message: e.to_string(),
    })
}
