//! Terminal response when every candidate has failed.

use gateway_core::{GatewayError, LayerMarker, TaskResponse, TaskType};
use std::collections::HashMap;

/// Provider id reported on failsafe responses
pub const FAILSAFE_PROVIDER_ID: &str = "failsafe";

const GENERIC_MESSAGE: &str =
    "The service is temporarily unable to complete this request. Please try again shortly.";

/// Produces canned responses per task type
#[derive(Debug, Clone)]
pub struct FailsafeResponder {
    messages: HashMap<TaskType, String>,
    generic: String,
}

impl FailsafeResponder {
    /// Responder with the built-in messages
    #[must_use]
    pub fn new() -> Self {
        let messages = [
            (
                TaskType::RealtimeChat,
                "I'm having trouble reaching my language services right now. Please try again in a moment.",
            ),
            (
                TaskType::Reasoning,
                "Detailed reasoning is unavailable at the moment. Please retry shortly.",
            ),
            (
                TaskType::CreativeWriting,
                "The writing service is busy right now. Please try again in a moment.",
            ),
            (
                TaskType::CodeGeneration,
                "Code generation is temporarily unavailable. Please retry shortly.",
            ),
            (
                TaskType::Analysis,
                "Analysis is temporarily unavailable. Please retry shortly.",
            ),
            (
                TaskType::ImageGeneration,
                "Image generation is temporarily unavailable. Please try again later.",
            ),
            (
                TaskType::VideoGeneration,
                "Video generation is temporarily unavailable. Please try again later.",
            ),
            (
                TaskType::SpeechSynthesis,
                "Speech synthesis is temporarily unavailable. Please try again later.",
            ),
            (
                TaskType::MusicGeneration,
                "Music generation is temporarily unavailable. Please try again later.",
            ),
        ]
        .into_iter()
        .map(|(task, message)| (task, message.to_string()))
        .collect();

        Self {
            messages,
            generic: GENERIC_MESSAGE.to_string(),
        }
    }

    /// Override the message for one task type
    #[must_use]
    pub fn with_message(mut self, task: TaskType, message: impl Into<String>) -> Self {
        self.messages.insert(task, message.into());
        self
    }

    /// Drop the message for one task type so it gets the generic text
    #[must_use]
    pub fn without_message(mut self, task: TaskType) -> Self {
        self.messages.remove(&task);
        self
    }

    /// Message for a task type
    #[must_use]
    pub fn message(&self, task: TaskType) -> &str {
        self.messages.get(&task).map_or(self.generic.as_str(), String::as_str)
    }

    /// Build the failsafe response for a task.
    ///
    /// Depends only on the arguments and this responder's messages, so it
    /// can be called repeatedly with identical results.
    #[must_use]
    pub fn response(&self, task: TaskType, error: Option<&GatewayError>) -> TaskResponse {
        let mut builder = TaskResponse::builder(FAILSAFE_PROVIDER_ID)
            .result(self.message(task))
            .layer(LayerMarker::Layer(0))
            .latency_ms(0)
            .meta("failsafe", true)
            .meta("task_type", task.as_str());
        if let Some(error) = error {
            builder = builder
                .meta("error", error.to_string())
                .meta("error_kind", error.kind().as_str());
        }
        builder.build()
    }
}

impl Default for FailsafeResponder {
    fn default() -> Self {
        Self::new()
    }
}
