//! Template-based media URL adapter.
//!
//! Builds the result URL by substituting the percent-encoded prompt into a
//! template. Backends of this kind render on first fetch, so the result is
//! the URL itself. With verification on, the URL is probed once before being
//! returned.

use super::http::{build_client, error_from_response, map_transport_error};
use super::ProviderAdapter;
use async_trait::async_trait;
use gateway_config::PROMPT_PLACEHOLDER;
use gateway_core::{GatewayError, GatewayResult, TaskRequest, TaskResponse};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Image URL adapter
#[derive(Debug)]
pub struct ImageUrlAdapter {
    id: String,
    url_template: String,
    verify: bool,
    timeout: Duration,
    client: Client,
}

impl ImageUrlAdapter {
    /// Create a new adapter
    ///
    /// # Errors
    /// Returns error if the template lacks the prompt placeholder or the HTTP
    /// client cannot be created
    pub fn new(
        id: impl Into<String>,
        url_template: impl Into<String>,
        verify: bool,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let id = id.into();
        let url_template = url_template.into();
        if !url_template.contains(PROMPT_PLACEHOLDER) {
            return Err(GatewayError::configuration(format!(
                "Provider {id} url_template must contain {PROMPT_PLACEHOLDER}"
            )));
        }
        Ok(Self {
            id,
            url_template,
            verify,
            timeout,
            client: build_client(timeout)?,
        })
    }

    /// Build the media URL for a prompt
    pub fn render_url(&self, prompt: &str) -> GatewayResult<Url> {
        let encoded = encode_prompt(prompt);
        let rendered = self.url_template.replace(PROMPT_PLACEHOLDER, &encoded);
        Url::parse(&rendered).map_err(|e| {
            GatewayError::provider(&self.id, format!("Invalid media URL {rendered}: {e}"), None)
        })
    }
}

/// Percent-encode a prompt for use inside a URL path or query
fn encode_prompt(prompt: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(prompt.trim().as_bytes()).collect();
    // Literal '+' is already escaped as %2B, so any remaining '+' is a space
    encoded.replace('+', "%20")
}

#[async_trait]
impl ProviderAdapter for ImageUrlAdapter {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        let url = self.render_url(&request.prompt)?;

        if self.verify {
            debug!(provider = %self.id, url = %url, "Verifying media URL");
            let response = self
                .client
                .head(url.clone())
                .send()
                .await
                .map_err(|e| map_transport_error(&self.id, &e, self.timeout))?;
            if !response.status().is_success() {
                return Err(error_from_response(&self.id, response).await);
            }
        }

        Ok(TaskResponse::builder(self.id.as_str())
            .result(url.as_str())
            .meta("media_url", url.as_str())
            .build())
    }
}
