//! Configuration errors.

use gateway_core::GatewayError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// File extension is not yaml, yml, toml or json
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    /// Environment override could not be applied
    #[error("Invalid value for {var}: {message}")]
    Env {
        /// Variable name
        var: String,
        /// Problem description
        message: String,
    },

    /// Configuration failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create a validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

impl From<ConfigError> for GatewayError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}
