//! # Task Gateway
//!
//! Command-line front end for the task routing gateway.
//!
//! ## Usage
//!
//! ```bash
//! # Route a chat prompt through the default provider catalog
//! task-gateway route chat "Summarize the plot of Hamlet"
//!
//! # Use a config file
//! task-gateway --config gateway.yaml providers
//!
//! # Queue a long-running task
//! task-gateway route video "A drone shot over a glacier" --user alice
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use gateway_config::{load_config, load_config_from_path, GatewayConfig};
use gateway_telemetry::{init_logging, LoggingConfig};
use tracing::{debug, info};

mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // The log level lives in the config, so loading runs before the
    // subscriber exists and is reported afterwards.
    let config = load(&cli).await?;
    init_tracing(&cli, &config)?;
    info!(
        source = %config_source(&cli),
        providers = config.providers.len(),
        execution_context = ?config.routing.execution_context,
        "Configuration loaded"
    );
    debug!(
        realtime_ms = config.timeouts.realtime.as_millis() as u64,
        complex_ms = config.timeouts.complex.as_millis() as u64,
        batch_ms = config.timeouts.batch.as_millis() as u64,
        max_fallback_hops = config.routing.max_fallback_hops,
        "Routing limits"
    );

    cli.execute(config).await
}

fn config_source(cli: &Cli) -> String {
    cli.config
        .as_ref()
        .map_or_else(|| "defaults".to_string(), |path| path.display().to_string())
}

async fn load(cli: &Cli) -> Result<GatewayConfig> {
    match &cli.config {
        Some(path) => load_config_from_path(path)
            .await
            .with_context(|| format!("failed to load {}", path.display())),
        None => load_config().await.context("failed to load configuration"),
    }
}

/// Verbosity flags override the configured level.
fn init_tracing(cli: &Cli, config: &GatewayConfig) -> Result<()> {
    let level = match cli.verbose {
        0 => config.telemetry.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };

    let logging = LoggingConfig::new()
        .with_level(level)
        .with_json(config.telemetry.json || cli.json);
    init_logging(&logging)?;
    Ok(())
}
