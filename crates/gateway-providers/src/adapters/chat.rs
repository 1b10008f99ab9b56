//! OpenAI-compatible chat completions adapter.
//!
//! Works against any backend exposing `POST {base_url}/chat/completions`:
//! OpenAI itself, Ollama, vLLM, LM Studio and similar local servers.

use super::http::{build_client, error_from_response, map_transport_error};
use super::ProviderAdapter;
use async_trait::async_trait;
use gateway_core::{GatewayError, GatewayResult, TaskRequest, TaskResponse};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, trace};

/// Chat completions adapter configuration
#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    /// Provider instance ID
    pub id: String,
    /// Base URL up to the API version segment
    pub base_url: String,
    /// Model name
    pub model: String,
    /// API key, if the backend needs one
    pub api_key: Option<SecretString>,
    /// Environment variable the key was expected in
    pub api_key_env: Option<String>,
    /// Cost per token in USD
    pub cost_per_token: Option<f64>,
    /// Request timeout
    pub timeout: Duration,
}

impl ChatCompletionsConfig {
    /// Create a configuration for an unauthenticated backend
    #[must_use]
    pub fn new(id: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            api_key_env: None,
            cost_per_token: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Set the API key
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key.into()));
        self
    }

    /// Read the API key from an environment variable.
    ///
    /// A missing variable is not an error here; calls fail with an
    /// authentication error instead.
    #[must_use]
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        let var = var.into();
        self.api_key = std::env::var(&var)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::new);
        self.api_key_env = Some(var);
        self
    }

    /// Set the cost per token
    #[must_use]
    pub fn with_cost_per_token(mut self, cost: Option<f64>) -> Self {
        self.cost_per_token = cost;
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Chat completions adapter
#[derive(Debug)]
pub struct ChatCompletionsAdapter {
    config: ChatCompletionsConfig,
    client: Client,
}

impl ChatCompletionsAdapter {
    /// Create a new adapter
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created
    pub fn new(config: ChatCompletionsConfig) -> GatewayResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn transform_request<'a>(&'a self, request: &'a TaskRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instruction) = request.system_instruction.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: instruction,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        ChatRequest {
            model: &self.config.model,
            messages,
        }
    }
}

#[async_trait]
impl ProviderAdapter for ChatCompletionsAdapter {
    fn provider_id(&self) -> &str {
        &self.config.id
    }

    async fn execute(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        let id = &self.config.id;
        if self.config.api_key.is_none() {
            if let Some(var) = &self.config.api_key_env {
                return Err(GatewayError::authentication(
                    id,
                    format!("API key not configured ({var} is unset)"),
                ));
            }
        }

        let url = self.completions_url();
        debug!(provider = %id, url = %url, model = %self.config.model, "Sending chat completion request");

        let mut builder = self.client.post(&url).json(&self.transform_request(request));
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| map_transport_error(id, &e, self.config.timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(id, response).await);
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::provider(id, format!("Failed to parse response: {e}"), None))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| GatewayError::provider(id, "Response contained no content", None))?;

        let tokens = body.usage.map(|usage| usage.total_tokens);
        trace!(provider = %id, tokens = ?tokens, "Chat completion received");

        let mut response = TaskResponse::builder(id.as_str())
            .result(content)
            .cost(self.config.cost_per_token.zip(tokens).map(|(rate, n)| rate * f64::from(n)))
            .meta("model", body.model.unwrap_or_else(|| self.config.model.clone()));
        if let Some(tokens) = tokens {
            response = response.meta("total_tokens", tokens);
        }
        Ok(response.build())
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}
