//! # Gateway Core
//!
//! Core types and error handling for the Task Gateway.
//!
//! This crate provides the foundational types used throughout the gateway:
//! - Task requests and responses
//! - Provider descriptors
//! - Closed domain enums (task types, capabilities, tiers)
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod provider;
pub mod request;
pub mod response;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorKind, GatewayError, GatewayResult};
pub use provider::ProviderDescriptor;
pub use request::{TaskRequest, TaskRequestBuilder};
pub use response::{TaskResponse, TaskResponseBuilder};
pub use types::{Capability, ExecutionContext, LayerMarker, TaskType, Tier, UnknownTaskType};
