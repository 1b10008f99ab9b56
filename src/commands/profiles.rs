//! Profiles command implementation.

use anyhow::Result;
use clap::Args;
use gateway_routing::{TaskProfile, TaskProfileTable};

use crate::output::{self, OutputFormat};

/// Arguments for the profiles command
#[derive(Args, Debug)]
pub struct ProfilesArgs {
    /// Show a single task type (unknown names fall back to chat)
    pub task: Option<String>,
}

/// Execute the profiles command
pub fn execute(args: ProfilesArgs, json: bool) -> Result<()> {
    let format = OutputFormat::from_json_flag(json);
    let table = TaskProfileTable::new();

    let profiles: Vec<&TaskProfile> = match &args.task {
        Some(name) => vec![table.profile_for_name(name)],
        None => table.iter().collect(),
    };

    match format {
        OutputFormat::Json => output::json(&profiles)?,
        OutputFormat::Text => {
            output::section("Task Profiles");
            for profile in profiles {
                println!("  {}", profile.task_type);
                output::key_value("Capability", profile.capability.as_str());
                output::key_value(
                    "Max latency",
                    &format!("{}ms", profile.max_latency.as_millis()),
                );
                output::key_value("Description", &profile.description);
            }
        }
    }

    Ok(())
}
