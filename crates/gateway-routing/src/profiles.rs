//! Task profiles: what each task type needs from a provider.

use gateway_core::{Capability, TaskType};
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

/// Requirements of one task type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProfile {
    /// Task type described
    pub task_type: TaskType,
    /// Capability a provider must offer
    pub capability: Capability,
    /// Latency budget
    #[serde(with = "duration_millis")]
    pub max_latency: Duration,
    /// Human-readable description
    pub description: String,
}

impl TaskProfile {
    /// Create a profile
    #[must_use]
    pub fn new(
        task_type: TaskType,
        capability: Capability,
        max_latency: Duration,
        description: impl Into<String>,
    ) -> Self {
        Self {
            task_type,
            capability,
            max_latency,
            description: description.into(),
        }
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

/// Profile for every task type
#[derive(Debug, Clone)]
pub struct TaskProfileTable {
    // Indexed by `TaskType as usize`; always holds one entry per variant
    profiles: Vec<TaskProfile>,
}

impl TaskProfileTable {
    /// Table with the built-in profiles
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: TaskType::ALL.iter().map(|task| default_profile(*task)).collect(),
        }
    }

    /// Replace the profile of one task type
    #[must_use]
    pub fn with_profile(mut self, profile: TaskProfile) -> Self {
        let index = profile.task_type as usize;
        self.profiles[index] = profile;
        self
    }

    /// Profile of a task type
    #[must_use]
    pub fn profile(&self, task: TaskType) -> &TaskProfile {
        &self.profiles[task as usize]
    }

    /// Profile for an untyped task name; unknown names get the chat profile
    #[must_use]
    pub fn profile_for_name(&self, name: &str) -> &TaskProfile {
        self.profile(Self::task_for_name(name))
    }

    /// Resolve an untyped task name; unknown names map to realtime chat
    #[must_use]
    pub fn task_for_name(name: &str) -> TaskType {
        name.parse().unwrap_or_else(|_| {
            warn!(task = %name, "Unknown task type, using the chat profile");
            TaskType::RealtimeChat
        })
    }

    /// All profiles, in task declaration order
    pub fn iter(&self) -> impl Iterator<Item = &TaskProfile> {
        self.profiles.iter()
    }
}

impl Default for TaskProfileTable {
    fn default() -> Self {
        Self::new()
    }
}

fn default_profile(task: TaskType) -> TaskProfile {
    let (capability, millis, description) = match task {
        TaskType::RealtimeChat => (Capability::Text, 10_000, "Interactive conversation"),
        TaskType::Reasoning => (Capability::Reasoning, 25_000, "Multi-step reasoning"),
        TaskType::CreativeWriting => (Capability::Text, 15_000, "Long-form creative writing"),
        TaskType::ImageGeneration => (Capability::Image, 30_000, "Still image generation"),
        TaskType::VideoGeneration => (Capability::Video, 300_000, "Video synthesis"),
        TaskType::SpeechSynthesis => (Capability::Audio, 20_000, "Text-to-speech"),
        TaskType::CodeGeneration => (Capability::Code, 30_000, "Source code generation"),
        TaskType::MusicGeneration => (Capability::Audio, 120_000, "Music generation"),
        TaskType::Analysis => (Capability::Reasoning, 25_000, "Document and data analysis"),
    };
    TaskProfile::new(task, capability, Duration::from_millis(millis), description)
}
