//! Error types for the gateway.
//!
//! Provider-side failures (`Provider`, `RateLimit`, `QuotaExceeded`, `Timeout`,
//! `Authentication`, `Offline`, `NotImplemented`) are absorbed by the router's
//! fallback loop and never reach callers. The remaining variants describe
//! invalid input, configuration or storage problems.

use crate::types::TaskType;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result type used throughout the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Coarse classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Generic backend failure
    Provider,
    /// Backend throttled the request
    RateLimit,
    /// Account quota exhausted
    QuotaExceeded,
    /// Attempt exceeded its deadline
    Timeout,
    /// Credentials rejected
    Authentication,
    /// Backend unreachable
    Offline,
    /// Adapter is a placeholder
    NotImplemented,
    /// Unknown provider id
    ProviderNotFound,
    /// Batch submission without caller identity
    MissingIdentity,
    /// Malformed input
    Validation,
    /// Invalid configuration
    Configuration,
    /// Job persistence failure
    Storage,
    /// Unexpected internal failure
    Internal,
}

impl ErrorKind {
    /// Stable snake_case name, used for metrics labels
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provider => "provider",
            Self::RateLimit => "rate_limit",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::Offline => "offline",
            Self::NotImplemented => "not_implemented",
            Self::ProviderNotFound => "provider_not_found",
            Self::MissingIdentity => "missing_identity",
            Self::Validation => "validation",
            Self::Configuration => "configuration",
            Self::Storage => "storage",
            Self::Internal => "internal",
        }
    }
}

/// Gateway error
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Generic backend failure
    #[error("Provider {provider} error: {message}")]
    Provider {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
        /// HTTP status, when the backend answered
        status: Option<u16>,
    },

    /// Backend throttled the request
    #[error("Provider {provider} rate limited the request")]
    RateLimit {
        /// Provider identifier
        provider: String,
        /// Suggested wait before retrying
        retry_after: Option<Duration>,
    },

    /// Account quota exhausted
    #[error("Provider {provider} quota exceeded: {message}")]
    QuotaExceeded {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
    },

    /// Attempt exceeded its deadline
    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout {
        /// Provider identifier
        provider: String,
        /// Deadline that elapsed
        timeout: Duration,
    },

    /// Credentials rejected
    #[error("Provider {provider} authentication failed: {message}")]
    Authentication {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
    },

    /// Backend unreachable
    #[error("Provider {provider} is offline: {message}")]
    Offline {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
    },

    /// Adapter is a placeholder with no backend behind it
    #[error("Provider {provider} is not implemented")]
    NotImplemented {
        /// Provider identifier
        provider: String,
    },

    /// Unknown provider id
    #[error("Provider not found: {provider}")]
    ProviderNotFound {
        /// Provider identifier
        provider: String,
    },

    /// Batch-eligible task submitted without a caller identity
    #[error("Task {task} requires a caller identity for batch submission")]
    MissingIdentity {
        /// Task that was submitted
        task: TaskType,
    },

    /// Malformed input
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Job persistence failure
    #[error("Storage error: {message}")]
    Storage {
        /// Error message
        message: String,
    },

    /// Unexpected internal failure
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create a generic provider error
    pub fn provider(
        provider: impl Into<String>,
        message: impl Into<String>,
        status: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status,
        }
    }

    /// Create a rate limit error
    pub fn rate_limit(provider: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            retry_after,
        }
    }

    /// Create a quota exceeded error
    pub fn quota_exceeded(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QuotaExceeded {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(provider: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout,
        }
    }

    /// Create an authentication error
    pub fn authentication(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Authentication {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an offline error
    pub fn offline(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Offline {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a not-implemented error
    pub fn not_implemented(provider: impl Into<String>) -> Self {
        Self::NotImplemented {
            provider: provider.into(),
        }
    }

    /// Create a provider-not-found error
    pub fn provider_not_found(provider: impl Into<String>) -> Self {
        Self::ProviderNotFound {
            provider: provider.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider { .. } => ErrorKind::Provider,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::Offline { .. } => ErrorKind::Offline,
            Self::NotImplemented { .. } => ErrorKind::NotImplemented,
            Self::ProviderNotFound { .. } => ErrorKind::ProviderNotFound,
            Self::MissingIdentity { .. } => ErrorKind::MissingIdentity,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the provider rejected our credentials.
    ///
    /// Authentication failures open the circuit breaker immediately and
    /// disable the provider, since waiting out a cooldown will not fix them.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Whether this error describes a provider outcome (as opposed to bad
    /// input or local misconfiguration)
    #[must_use]
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Provider
                | ErrorKind::RateLimit
                | ErrorKind::QuotaExceeded
                | ErrorKind::Timeout
                | ErrorKind::Authentication
                | ErrorKind::Offline
                | ErrorKind::NotImplemented
        )
    }
}
