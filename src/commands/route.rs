//! Route command implementation.

use anyhow::Result;
use clap::{Args, ValueEnum};
use gateway_config::GatewayConfig;
use gateway_core::{TaskRequest, TaskResponse, Tier};
use gateway_resilience::ProviderHealth;
use gateway_routing::{Gateway, TaskProfileTable};
use gateway_telemetry::TelemetryEvent;
use serde::Serialize;

use crate::output::{self, OutputFormat};

/// Arguments for the route command
#[derive(Args, Debug)]
pub struct RouteArgs {
    /// Task type (e.g. chat, reasoning, image, video, speech, code)
    pub task: String,

    /// Prompt text
    pub prompt: String,

    /// System instruction for text providers
    #[arg(short, long)]
    pub system: Option<String>,

    /// Caller identity, required for batch tasks
    #[arg(short, long, env = "TASK_GATEWAY_USER")]
    pub user: Option<String>,

    /// Caller tier
    #[arg(long, value_enum)]
    pub tier: Option<TierArg>,

    /// Source image reference
    #[arg(long)]
    pub image: Option<String>,

    /// Voice sample reference
    #[arg(long)]
    pub voice: Option<String>,

    /// Print provider health, telemetry and metrics after routing
    #[arg(long)]
    pub stats: bool,
}

/// Caller tier accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierArg {
    /// Free tier
    Free,
    /// Paid tier
    Pro,
    /// Enterprise tier
    Enterprise,
}

impl From<TierArg> for Tier {
    fn from(value: TierArg) -> Self {
        match value {
            TierArg::Free => Self::Free,
            TierArg::Pro => Self::Pro,
            TierArg::Enterprise => Self::Enterprise,
        }
    }
}

#[derive(Debug, Serialize)]
struct RouteOutput {
    response: TaskResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<RouteStats>,
}

#[derive(Debug, Serialize)]
struct RouteStats {
    health: Vec<ProviderHealth>,
    events: Vec<TelemetryEvent>,
    metrics: String,
}

/// Execute the route command
pub async fn execute(args: RouteArgs, config: &GatewayConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let request = build_request(&args)?;

    let gateway = Gateway::from_config(config).await?;
    let response = gateway.route_request(&request).await?;

    let stats = if args.stats {
        Some(RouteStats {
            health: gateway.health().snapshot_all(),
            events: gateway.telemetry().snapshot(),
            metrics: gateway.metrics().encode()?,
        })
    } else {
        None
    };

    let result = RouteOutput { response, stats };
    match format {
        OutputFormat::Json => output::json(&result)?,
        OutputFormat::Text => print_text(&result),
    }

    Ok(())
}

fn build_request(args: &RouteArgs) -> Result<TaskRequest> {
    let task = TaskProfileTable::task_for_name(&args.task);
    let mut builder = TaskRequest::builder(task).prompt(&args.prompt);
    if let Some(system) = &args.system {
        builder = builder.system_instruction(system);
    }
    if let Some(user) = &args.user {
        builder = builder.user_id(user);
    }
    if let Some(tier) = args.tier {
        builder = builder.tier(tier.into());
    }
    if let Some(image) = &args.image {
        builder = builder.source_image(image);
    }
    if let Some(voice) = &args.voice {
        builder = builder.voice_reference(voice);
    }
    Ok(builder.build()?)
}

fn print_text(result: &RouteOutput) {
    output::task_response(&result.response);

    if let Some(stats) = &result.stats {
        output::section("Provider Health");
        for health in &stats.health {
            output::provider_health(health);
        }

        output::section("Telemetry");
        for event in &stats.events {
            output::telemetry_event(event);
        }

        output::section("Metrics");
        print!("{}", stats.metrics);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::TaskType;

    fn args(task: &str, prompt: &str) -> RouteArgs {
        RouteArgs {
            task: task.to_string(),
            prompt: prompt.to_string(),
            system: None,
            user: None,
            tier: None,
            image: None,
            voice: None,
            stats: false,
        }
    }

    #[test]
    fn test_build_request_maps_flags() {
        let mut route = args("code", "write fizzbuzz");
        route.system = Some("be terse".to_string());
        route.user = Some("alice".to_string());
        route.tier = Some(TierArg::Pro);

        let request = build_request(&route).unwrap();
        assert_eq!(request.task_type, TaskType::CodeGeneration);
        assert_eq!(request.system_instruction.as_deref(), Some("be terse"));
        assert_eq!(request.caller(), Some("alice"));
        assert_eq!(request.tier, Some(Tier::Pro));
    }

    #[test]
    fn test_build_request_unknown_task_routes_as_chat() {
        let request = build_request(&args("telepathy", "hi")).unwrap();
        assert_eq!(request.task_type, TaskType::RealtimeChat);
    }
}
