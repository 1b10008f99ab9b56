//! Health command implementation.

use anyhow::Result;
use clap::Args;
use gateway_config::GatewayConfig;
use gateway_core::TaskType;
use gateway_resilience::CircuitState;
use gateway_routing::{Gateway, ProviderScore, TaskProfileTable};
use serde::Serialize;

use crate::output::{self, OutputFormat};

/// Arguments for the health command
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Rank candidates for this task type only
    pub task: Option<String>,
}

/// Candidate ranking for one task type
#[derive(Debug, Serialize)]
struct TaskCandidates {
    task_type: TaskType,
    candidates: Vec<CandidateHealth>,
}

#[derive(Debug, Serialize)]
struct CandidateHealth {
    provider_id: String,
    layer: u8,
    circuit: CircuitState,
    score: ProviderScore,
}

/// Execute the health command
pub async fn execute(args: HealthArgs, config: &GatewayConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let gateway = Gateway::from_config(config).await?;

    let tasks = match &args.task {
        Some(name) => vec![TaskProfileTable::task_for_name(name)],
        None => TaskType::ALL.to_vec(),
    };

    let report: Vec<TaskCandidates> = tasks
        .into_iter()
        .map(|task_type| TaskCandidates {
            task_type,
            candidates: gateway
                .candidates(task_type)
                .into_iter()
                .map(|ranked| CandidateHealth {
                    circuit: gateway.health().state(&ranked.descriptor.id),
                    provider_id: ranked.descriptor.id,
                    layer: ranked.descriptor.layer,
                    score: ranked.score,
                })
                .collect(),
        })
        .collect();

    match format {
        OutputFormat::Json => output::json(&report)?,
        OutputFormat::Text => {
            for entry in &report {
                output::section(entry.task_type.as_str());
                if entry.candidates.is_empty() {
                    output::warning("No eligible providers; requests end in the failsafe response");
                }
                for candidate in &entry.candidates {
                    output::status(
                        &format!(
                            "{} L{} score {:.1} [{}]",
                            candidate.provider_id,
                            candidate.layer,
                            candidate.score.composite,
                            output::circuit_label(candidate.circuit)
                        ),
                        candidate.circuit != CircuitState::Open,
                    );
                }
            }
        }
    }

    Ok(())
}
