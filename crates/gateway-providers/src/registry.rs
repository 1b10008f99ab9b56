//! Provider registry.
//!
//! Holds provider descriptors in registration order. Order matters: the
//! scorer's stable sort keeps it for equal scores.

use gateway_config::ProviderConfig;
use gateway_core::{Capability, GatewayError, GatewayResult, ProviderDescriptor};
use parking_lot::RwLock;
use tracing::{info, warn};

/// Registry of known providers
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<ProviderDescriptor>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry from descriptors, keeping their order
    #[must_use]
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = ProviderDescriptor>) -> Self {
        let registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    /// Create a registry from provider configuration
    #[must_use]
    pub fn from_configs(configs: &[ProviderConfig]) -> Self {
        Self::from_descriptors(configs.iter().map(ProviderConfig::descriptor))
    }

    /// Register a provider, replacing any descriptor with the same id in place
    pub fn register(&self, descriptor: ProviderDescriptor) {
        let mut providers = self.providers.write();
        if let Some(existing) = providers.iter_mut().find(|p| p.id == descriptor.id) {
            warn!(provider = %descriptor.id, "Replacing registered provider");
            *existing = descriptor;
        } else {
            info!(
                provider = %descriptor.id,
                layer = descriptor.layer,
                enabled = descriptor.enabled,
                "Registered provider"
            );
            providers.push(descriptor);
        }
    }

    /// All providers, optionally restricted to one layer
    #[must_use]
    pub fn list(&self, layer: Option<u8>) -> Vec<ProviderDescriptor> {
        self.providers
            .read()
            .iter()
            .filter(|p| layer.map_or(true, |l| p.layer == l))
            .cloned()
            .collect()
    }

    /// Enabled providers offering a capability, in registration order
    #[must_use]
    pub fn list_by_capability(&self, capability: Capability) -> Vec<ProviderDescriptor> {
        self.providers
            .read()
            .iter()
            .filter(|p| p.enabled && p.supports(capability))
            .cloned()
            .collect()
    }

    /// Look up a provider
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProviderDescriptor> {
        self.providers.read().iter().find(|p| p.id == id).cloned()
    }

    /// Enable or disable a provider
    pub fn set_enabled(&self, id: &str, enabled: bool, reason: Option<&str>) -> GatewayResult<()> {
        let mut providers = self.providers.write();
        let provider = providers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GatewayError::provider_not_found(id))?;

        provider.enabled = enabled;
        provider.disabled_reason = if enabled {
            None
        } else {
            reason.map(str::to_string)
        };

        if enabled {
            info!(provider = %id, "Provider enabled");
        } else {
            warn!(provider = %id, reason = reason.unwrap_or("unspecified"), "Provider disabled");
        }
        Ok(())
    }

    /// Registered ids, in registration order
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.providers.read().iter().map(|p| p.id.clone()).collect()
    }

    /// Number of registered providers
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Whether no providers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }
}
