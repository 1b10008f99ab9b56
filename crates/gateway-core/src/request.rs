//! Request types for the gateway.
//!
//! A [`TaskRequest`] is an immutable description of one unit of AI work. It is
//! built by the caller per invocation and lives only as long as the call.

use crate::error::{GatewayError, GatewayResult};
use crate::types::{TaskType, Tier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on prompt length accepted by the gateway, in bytes
pub const MAX_PROMPT_BYTES: usize = 256 * 1024;

/// Unified task request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Correlation id for telemetry and job records
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Kind of work requested
    pub task_type: TaskType,

    /// Prompt text
    pub prompt: String,

    /// System instruction prepended for text providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,

    /// Reference to a source image (URL or data URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,

    /// Reference to a voice sample for speech tasks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_reference: Option<String>,

    /// Caller identity, required for batch submission
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Caller subscription tier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

impl TaskRequest {
    /// Create a new builder for `TaskRequest`
    #[must_use]
    pub fn builder(task_type: TaskType) -> TaskRequestBuilder {
        TaskRequestBuilder::new(task_type)
    }

    /// Validate the request
    ///
    /// # Errors
    /// Returns error if the prompt is empty or too large
    pub fn validate(&self) -> GatewayResult<()> {
        if self.prompt.trim().is_empty() {
            return Err(GatewayError::validation("prompt cannot be empty"));
        }
        if self.prompt.len() > MAX_PROMPT_BYTES {
            return Err(GatewayError::validation(format!(
                "prompt exceeds {MAX_PROMPT_BYTES} bytes"
            )));
        }
        Ok(())
    }

    /// Caller identity, if present and non-blank
    #[must_use]
    pub fn caller(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Builder for `TaskRequest`
#[derive(Debug, Clone)]
pub struct TaskRequestBuilder {
    id: Option<Uuid>,
    task_type: TaskType,
    prompt: Option<String>,
    system_instruction: Option<String>,
    source_image: Option<String>,
    voice_reference: Option<String>,
    user_id: Option<String>,
    tier: Option<Tier>,
}

impl TaskRequestBuilder {
    fn new(task_type: TaskType) -> Self {
        Self {
            id: None,
            task_type,
            prompt: None,
            system_instruction: None,
            source_image: None,
            voice_reference: None,
            user_id: None,
            tier: None,
        }
    }

    /// Set the request id
    #[must_use]
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the prompt
    #[must_use]
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the system instruction
    #[must_use]
    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set the source image reference
    #[must_use]
    pub fn source_image(mut self, reference: impl Into<String>) -> Self {
        self.source_image = Some(reference.into());
        self
    }

    /// Set the voice reference
    #[must_use]
    pub fn voice_reference(mut self, reference: impl Into<String>) -> Self {
        self.voice_reference = Some(reference.into());
        self
    }

    /// Set the caller identity
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the tier
    #[must_use]
    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(tier);
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns error if the prompt is missing or invalid
    pub fn build(self) -> GatewayResult<TaskRequest> {
        let prompt = self
            .prompt
            .ok_or_else(|| GatewayError::validation("prompt is required"))?;

        let request = TaskRequest {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            task_type: self.task_type,
            prompt,
            system_instruction: self.system_instruction,
            source_image: self.source_image,
            voice_reference: self.voice_reference,
            user_id: self.user_id,
            tier: self.tier,
        };

        request.validate()?;

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = TaskRequest::builder(TaskType::RealtimeChat)
            .prompt("Hello")
            .system_instruction("Be brief")
            .user_id("user-1")
            .tier(Tier::Pro)
            .build()
            .expect("should build");

        assert_eq!(request.task_type, TaskType::RealtimeChat);
        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.caller(), Some("user-1"));
        assert_eq!(request.tier, Some(Tier::Pro));
    }

    #[test]
    fn test_request_builder_missing_prompt() {
        let request = TaskRequest::builder(TaskType::Reasoning).build();
        assert!(request.is_err());
    }

    #[test]
    fn test_request_builder_blank_prompt() {
        let request = TaskRequest::builder(TaskType::Reasoning).prompt("   ").build();
        assert!(request.is_err());
    }

    #[test]
    fn test_blank_user_id_is_not_an_identity() {
        let request = TaskRequest::builder(TaskType::VideoGeneration)
            .prompt("a sunset")
            .user_id("  ")
            .build()
            .expect("should build");
        assert_eq!(request.caller(), None);
    }

    #[test]
    fn test_request_deserializes_with_generated_id() {
        let request: TaskRequest = serde_json::from_str(
            r#"{"task_type":"image_generation","prompt":"a red fox"}"#,
        )
        .expect("should parse");
        assert_eq!(request.task_type, TaskType::ImageGeneration);
        assert!(request.user_id.is_none());
    }
}
