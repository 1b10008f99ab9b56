//! Validate command implementation.

use anyhow::Result;
use clap::Args;
use gateway_config::GatewayConfig;
use serde::Serialize;
use std::path::Path;

use crate::output::{self, OutputFormat};

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Print the effective configuration
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Serialize)]
struct ValidateOutput<'a> {
    valid: bool,
    source: String,
    providers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<&'a GatewayConfig>,
}

/// Execute the validate command.
///
/// Loading already validated the configuration, so reaching this point
/// means it is valid; the check is repeated to report it explicitly.
pub fn execute(
    args: ValidateArgs,
    config: &GatewayConfig,
    path: Option<&Path>,
    json: bool,
) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    config.validate()?;

    let source = path.map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
    let result = ValidateOutput {
        valid: true,
        source,
        providers: config.providers.len(),
        config: args.show.then_some(config),
    };

    match format {
        OutputFormat::Json => output::json(&result)?,
        OutputFormat::Text => {
            output::success(&format!("Configuration is valid ({})", result.source));
            output::key_value("Providers", &result.providers.to_string());
            output::key_value(
                "Timeouts",
                &format!(
                    "realtime {}ms, complex {}ms, batch {}ms",
                    config.timeouts.realtime.as_millis(),
                    config.timeouts.complex.as_millis(),
                    config.timeouts.batch.as_millis()
                ),
            );
            output::key_value(
                "Circuit breaker",
                &format!(
                    "{} failures, {}s cooldown",
                    config.circuit_breaker.failure_threshold,
                    config.circuit_breaker.cooldown.as_secs()
                ),
            );
            output::key_value(
                "Max fallback hops",
                &config.routing.max_fallback_hops.to_string(),
            );
            output::key_value(
                "Batch",
                &format!(
                    "{} concurrent jobs, polled every {}s",
                    config.batch.max_concurrent_jobs,
                    config.batch.poll_interval.as_secs()
                ),
            );
            if args.show {
                output::section("Effective configuration");
                output::json(config)?;
            }
        }
    }

    Ok(())
}
