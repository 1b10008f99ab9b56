//! # Gateway Providers
//!
//! Provider registry and backend adapters for the Task Gateway.
//!
//! Adapters:
//! - Chat completions (OpenAI and OpenAI-compatible local servers)
//! - Template-based image URLs
//! - Trusted proxy forwarding
//! - Placeholders for providers without a backend

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapters;
pub mod registry;

// Re-export main types
pub use adapters::{
    AdapterKind, AdapterSet, ChatCompletionsAdapter, ChatCompletionsConfig, ImageUrlAdapter,
    ProviderAdapter, TrustedProxyAdapter, UnimplementedAdapter,
};
pub use registry::ProviderRegistry;
