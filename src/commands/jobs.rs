//! Jobs command implementation.

use anyhow::{bail, Result};
use clap::{Args, Subcommand, ValueEnum};
use gateway_config::{GatewayConfig, JobStoreSettings};
use gateway_routing::{BatchJob, BatchQueue, JobStatus};

use crate::output::{self, OutputFormat};

/// Arguments for the jobs command
#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Jobs subcommand
    #[command(subcommand)]
    pub command: JobsCommand,
}

/// Jobs subcommands
#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List all batch jobs
    List,

    /// Show one job
    Status {
        /// Ticket returned when the job was queued
        ticket: String,
    },

    /// Move a job to a new status
    SetStatus {
        /// Ticket returned when the job was queued
        ticket: String,
        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },
}

/// Job status accepted on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusArg {
    /// Waiting for a worker
    Pending,
    /// Picked up by a worker
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl From<StatusArg> for JobStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => Self::Pending,
            StatusArg::Processing => Self::Processing,
            StatusArg::Completed => Self::Completed,
            StatusArg::Failed => Self::Failed,
        }
    }
}

/// Execute the jobs command
pub async fn execute(args: JobsArgs, config: &GatewayConfig, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);

    if matches!(config.batch.store, JobStoreSettings::Memory) {
        output::warning("Job store is in-memory; jobs from earlier runs are not visible");
    }
    let queue = BatchQueue::from_settings(&config.batch.store).await?;

    match args.command {
        JobsCommand::List => {
            let jobs = queue.list().await?;
            match format {
                OutputFormat::Json => output::json(&jobs)?,
                OutputFormat::Text => {
                    output::section("Batch Jobs");
                    if jobs.is_empty() {
                        output::info("No jobs");
                    }
                    for job in &jobs {
                        output::batch_job(job);
                    }
                }
            }
        }
        JobsCommand::Status { ticket } => {
            let job = find(&queue, &ticket).await?;
            match format {
                OutputFormat::Json => output::json(&job)?,
                OutputFormat::Text => output::batch_job(&job),
            }
        }
        JobsCommand::SetStatus { ticket, status } => {
            let job = find(&queue, &ticket).await?;
            let Some(job) = queue.update_status(job.id, status.into()).await? else {
                bail!("job {ticket} disappeared while updating");
            };
            match format {
                OutputFormat::Json => output::json(&job)?,
                OutputFormat::Text => {
                    output::success(&format!("{} is now {}", job.ticket(), job.status.as_str()));
                }
            }
        }
    }

    Ok(())
}

async fn find(queue: &BatchQueue, ticket: &str) -> Result<BatchJob> {
    if BatchQueue::parse_ticket(ticket).is_none() {
        bail!("malformed ticket: {ticket}");
    }
    match queue.get_by_ticket(ticket).await? {
        Some(job) => Ok(job),
        None => bail!("no job for ticket {ticket}"),
    }
}
