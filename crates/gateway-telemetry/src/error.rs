//! Telemetry errors.

/// Telemetry initialization or export error
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to install the log subscriber
    #[error("Failed to initialize logging: {0}")]
    Init(String),
    /// Metric registration or gathering failed
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    /// Metrics could not be rendered
    #[error("Failed to encode metrics: {0}")]
    Encode(String),
}
