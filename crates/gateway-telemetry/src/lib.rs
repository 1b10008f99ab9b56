//! # Gateway Telemetry
//!
//! Observability for the Task Gateway:
//! - Bounded log of routing events
//! - Prometheus routing metrics
//! - Structured logging setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod logging;
pub mod metrics;

// Re-export main types
pub use error::TelemetryError;
pub use events::{TelemetryEvent, TelemetryLog, DEFAULT_CAPACITY};
pub use logging::{init_logging, LoggingConfig};
pub use metrics::{RouteOutcome, RoutingMetrics};
