//! Terminal rendering for gateway results.
//!
//! Text mode prints colored summaries; JSON mode prints the serialized value
//! unchanged so scripts can consume it.

use colored::Colorize;
use gateway_core::TaskResponse;
use gateway_resilience::{CircuitState, ProviderHealth};
use gateway_routing::BatchJob;
use gateway_telemetry::TelemetryEvent;
use serde::Serialize;

/// How a command renders its result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored text for a terminal
    Text,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// Pick the format from the global `--json` flag
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Completed action
pub fn success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

/// Degraded outcome; goes to stderr so JSON on stdout stays clean
pub fn warning(message: &str) {
    eprintln!("{} {message}", "⚠".yellow().bold());
}

/// Neutral note
pub fn info(message: &str) {
    println!("{} {message}", "ℹ".blue().bold());
}

/// Indented `key: value` line
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {value}", key.bold());
}

/// Underlined heading preceded by a blank line
pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Green or red bullet before a label
pub fn status(label: &str, ok: bool) {
    let bullet = if ok { "●".green() } else { "●".red() };
    println!("  {bullet} {label}");
}

/// Pretty JSON on stdout
pub fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Lowercase breaker state name
pub fn circuit_label(state: CircuitState) -> &'static str {
    match state {
        CircuitState::Closed => "closed",
        CircuitState::Open => "open",
        CircuitState::HalfOpen => "half-open",
    }
}

/// Routed response: outcome line, routing details, sorted metadata, result
pub fn task_response(response: &TaskResponse) {
    if response.is_failsafe() {
        warning("No provider could complete the task; returning the failsafe response");
    } else {
        success(&format!("Routed to {}", response.provider_id));
    }

    section("Response");
    key_value("Provider", &response.provider_id);
    key_value("Layer", &response.layer.to_string());
    key_value("Latency", &format!("{}ms", response.latency_ms));
    if let Some(cost) = response.cost {
        key_value("Cost", &format!("${cost:.6}"));
    }
    if response.cached == Some(true) {
        key_value("Cached", "yes");
    }
    for (key, value) in sorted_metadata(response) {
        key_value(key, &value.to_string());
    }
    println!();
    println!("{}", response.result);
}

fn sorted_metadata(response: &TaskResponse) -> Vec<(&String, &serde_json::Value)> {
    let mut metadata: Vec<_> = response.metadata.iter().collect();
    metadata.sort_by(|a, b| a.0.cmp(b.0));
    metadata
}

/// One provider's health record as a status line
pub fn provider_health(health: &ProviderHealth) {
    status(&health_summary(health), !health.circuit_open);
}

fn health_summary(health: &ProviderHealth) -> String {
    let latency = health
        .avg_latency_ms
        .map_or_else(|| "n/a".to_string(), |ms| format!("{ms:.0}ms"));
    format!(
        "{} (failures: {}, success rate: {:.0}%, latency: {latency})",
        health.provider_id,
        health.consecutive_failures,
        health.success_rate * 100.0
    )
}

/// Telemetry event as `type: provider`
pub fn telemetry_event(event: &TelemetryEvent) {
    key_value(event.event_type(), event.provider().unwrap_or("-"));
}

/// Batch job with its ticket as the heading
pub fn batch_job(job: &BatchJob) {
    println!("  {}", job.ticket());
    key_value("Status", job.status.as_str());
    key_value("Task", job.request.task_type.as_str());
    if let Some(user) = job.request.caller() {
        key_value("User", user);
    }
    key_value("Created", &job.created_at.to_rfc3339());
    key_value("Updated", &job.updated_at.to_rfc3339());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_flag() {
        assert_eq!(OutputFormat::from_json_flag(true), OutputFormat::Json);
        assert_eq!(OutputFormat::from_json_flag(false), OutputFormat::Text);
    }

    #[test]
    fn test_metadata_is_sorted() {
        let response = TaskResponse::builder("openai")
            .result("hi")
            .meta("score", 91.5)
            .meta("attempts", 1)
            .meta("latency_class", "realtime")
            .build();
        let keys: Vec<&str> = sorted_metadata(&response)
            .into_iter()
            .map(|(key, _)| key.as_str())
            .collect();
        assert_eq!(keys, vec!["attempts", "latency_class", "score"]);
    }

    #[test]
    fn test_health_summary_without_samples() {
        let summary = health_summary(&ProviderHealth::new("local-llm"));
        assert_eq!(
            summary,
            "local-llm (failures: 0, success rate: 100%, latency: n/a)"
        );
    }

    #[test]
    fn test_circuit_labels() {
        assert_eq!(circuit_label(CircuitState::HalfOpen), "half-open");
        assert_eq!(circuit_label(CircuitState::Open), "open");
    }
}
