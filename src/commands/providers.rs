//! Providers command implementation.

use anyhow::Result;
use clap::Args;
use gateway_config::GatewayConfig;
use gateway_core::Capability;
use gateway_providers::{AdapterKind, ProviderRegistry};
use serde::Serialize;

use crate::output::{self, OutputFormat};

/// Arguments for the providers command
#[derive(Args, Debug)]
pub struct ProvidersArgs {
    /// Only show providers registered at this layer
    #[arg(short, long)]
    pub layer: Option<u8>,

    /// Only show enabled providers offering this capability
    #[arg(short = 'C', long)]
    pub capability: Option<String>,
}

/// Provider row
#[derive(Debug, Serialize)]
struct ProviderInfo {
    id: String,
    name: String,
    layer: u8,
    capabilities: Vec<String>,
    enabled: bool,
    requires_server_side: bool,
    adapter: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    disabled_reason: Option<String>,
}

/// Execute the providers command
pub async fn execute(args: ProvidersArgs, config: &GatewayConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let registry = ProviderRegistry::from_configs(&config.providers);

    let descriptors = match &args.capability {
        Some(name) => {
            let capability: Capability = name.parse().map_err(anyhow::Error::msg)?;
            registry
                .list_by_capability(capability)
                .into_iter()
                .filter(|d| args.layer.map_or(true, |layer| d.layer == layer))
                .collect()
        }
        None => registry.list(args.layer),
    };

    let mut providers = Vec::with_capacity(descriptors.len());
    for descriptor in descriptors {
        let adapter = config
            .providers
            .iter()
            .find(|p| p.id == descriptor.id)
            .map(AdapterKind::from_config)
            .transpose()?
            .map_or("none", |kind| kind.kind_name());

        providers.push(ProviderInfo {
            capabilities: descriptor
                .capabilities
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
            id: descriptor.id,
            name: descriptor.name,
            layer: descriptor.layer,
            enabled: descriptor.enabled,
            requires_server_side: descriptor.requires_server_side,
            adapter,
            disabled_reason: descriptor.disabled_reason,
        });
    }

    match format {
        OutputFormat::Json => output::json(&providers)?,
        OutputFormat::Text => {
            output::section("Providers");
            if providers.is_empty() {
                output::info("No providers match");
            }
            for provider in &providers {
                output::status(
                    &format!("{} ({}) L{}", provider.id, provider.name, provider.layer),
                    provider.enabled,
                );
                output::key_value("Capabilities", &provider.capabilities.join(", "));
                output::key_value("Adapter", provider.adapter);
                if provider.requires_server_side {
                    output::key_value("Server-side", "yes");
                }
                if let Some(reason) = &provider.disabled_reason {
                    output::key_value("Disabled", reason);
                }
            }
        }
    }

    Ok(())
}
