//! # Gateway Resilience
//!
//! Resilience patterns for the Task Gateway:
//! - Per-provider circuit breaker with a single half-open trial
//! - Health tracking (latency EWMA, decayed success rate)
//! - Attempt deadlines

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod circuit_breaker;
pub mod clock;
pub mod health;
pub mod timeout;

// Re-export main types
pub use circuit_breaker::{CircuitBreakerConfig, CircuitState, ProviderHealth, LATENCY_EWMA_ALPHA};
pub use clock::{Clock, ManualClock, SystemClock};
pub use health::HealthTracker;
pub use timeout::{run_with_timeout, LatencyClass, TimeoutPolicy};
