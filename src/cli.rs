//! CLI argument definitions.

use clap::{Parser, Subcommand};
use gateway_config::GatewayConfig;
use std::path::PathBuf;

use crate::commands;

/// Task Gateway CLI
#[derive(Parser, Debug)]
#[command(name = "task-gateway")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, global = true, env = "TASK_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route a task through the gateway
    Route(commands::route::RouteArgs),

    /// List registered providers
    Providers(commands::providers::ProvidersArgs),

    /// Show the task profile table
    Profiles(commands::profiles::ProfilesArgs),

    /// Show provider health and circuit breaker state
    Health(commands::health::HealthArgs),

    /// Validate the configuration
    Validate(commands::validate::ValidateArgs),

    /// Inspect and update batch jobs
    Jobs(commands::jobs::JobsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self, config: GatewayConfig) -> anyhow::Result<()> {
        match self.command {
            Commands::Route(args) => commands::route::execute(args, &config, self.json).await,
            Commands::Providers(args) => {
                commands::providers::execute(args, &config, self.json).await
            }
            Commands::Profiles(args) => commands::profiles::execute(args, self.json),
            Commands::Health(args) => commands::health::execute(args, &config, self.json).await,
            Commands::Validate(args) => {
                commands::validate::execute(args, &config, self.config.as_deref(), self.json)
            }
            Commands::Jobs(args) => commands::jobs::execute(args, &config, self.json).await,
        }
    }
}
