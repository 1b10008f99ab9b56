//! Provider descriptors.

use crate::types::Capability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Static description of a backend provider, owned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Unique provider identifier; adapters and health records share this id
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Cost/trust tier: 0 is the cheapest baseline, higher is more specialized
    pub layer: u8,
    /// Work this provider can perform
    pub capabilities: BTreeSet<Capability>,
    /// Whether the router may select this provider
    pub enabled: bool,
    /// Whether calls need server-held secrets
    #[serde(default)]
    pub requires_server_side: bool,
    /// Maximum context window in tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context: Option<u32>,
    /// Cost per token in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_token: Option<f64>,
    /// Why the provider was disabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

impl ProviderDescriptor {
    /// Create an enabled descriptor with no capabilities
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, layer: u8) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            layer,
            capabilities: BTreeSet::new(),
            enabled: true,
            requires_server_side: false,
            max_context: None,
            cost_per_token: None,
            disabled_reason: None,
        }
    }

    /// Add a capability
    #[must_use]
    pub fn with_capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Add several capabilities
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(capabilities);
        self
    }

    /// Mark the provider as needing server-side secrets
    #[must_use]
    pub fn server_side(mut self) -> Self {
        self.requires_server_side = true;
        self
    }

    /// Set the context window
    #[must_use]
    pub fn with_max_context(mut self, tokens: u32) -> Self {
        self.max_context = Some(tokens);
        self
    }

    /// Set the per-token cost
    #[must_use]
    pub fn with_cost_per_token(mut self, cost: f64) -> Self {
        self.cost_per_token = Some(cost);
        self
    }

    /// Start disabled
    #[must_use]
    pub fn disabled(mut self, reason: impl Into<String>) -> Self {
        self.enabled = false;
        self.disabled_reason = Some(reason.into());
        self
    }

    /// Whether the provider offers a capability
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
