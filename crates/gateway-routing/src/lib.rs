//! # Gateway Routing
//!
//! Capability-aware routing for the Task Gateway.
//!
//! This crate provides:
//! - Task profiles mapping task types to capabilities and latency budgets
//! - Weighted provider scoring
//! - Fallback across ranked providers under circuit breaker control
//! - A batch queue for long-running tasks
//! - Canned failsafe responses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod failsafe;
pub mod gateway;
pub mod profiles;
pub mod scorer;

// Re-export main types
pub use batch::{
    BatchJob, BatchQueue, InMemoryJobStore, JobStatus, JobStore, JsonFileJobStore,
    BATCH_PROVIDER_ID, TICKET_PREFIX,
};
pub use failsafe::{FailsafeResponder, FAILSAFE_PROVIDER_ID};
pub use gateway::{Gateway, GatewayBuilder, RoutingOptions};
pub use profiles::{TaskProfile, TaskProfileTable};
pub use scorer::{ProviderScore, RankedProvider, Scorer, ScoringWeights};
