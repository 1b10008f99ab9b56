//! Trusted proxy adapter.
//!
//! Forwards the whole task to an intermediary that holds provider secrets on
//! the caller's behalf. Because no credential ever leaves the proxy, these
//! adapters pass the untrusted-context safety filter.

use super::http::{build_client, error_from_response, map_transport_error};
use super::ProviderAdapter;
use async_trait::async_trait;
use gateway_core::{GatewayError, GatewayResult, TaskRequest, TaskResponse};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Header carrying the task correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Trusted proxy adapter
#[derive(Debug)]
pub struct TrustedProxyAdapter {
    id: String,
    endpoint: String,
    timeout: Duration,
    client: Client,
}

impl TrustedProxyAdapter {
    /// Create a new adapter
    ///
    /// # Errors
    /// Returns error if HTTP client cannot be created
    pub fn new(
        id: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        Ok(Self {
            id: id.into(),
            endpoint: endpoint.into(),
            timeout,
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for TrustedProxyAdapter {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn proxies_through_trusted_boundary(&self) -> bool {
        true
    }

    async fn execute(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        debug!(provider = %self.id, endpoint = %self.endpoint, task_id = %request.id, "Forwarding task to proxy");

        let response = self
            .client
            .post(&self.endpoint)
            .header(REQUEST_ID_HEADER, request.id.to_string())
            .json(request)
            .send()
            .await
            .map_err(|e| map_transport_error(&self.id, &e, self.timeout))?;

        if !response.status().is_success() {
            return Err(error_from_response(&self.id, response).await);
        }

        let body: ProxyResponse = response.json().await.map_err(|e| {
            GatewayError::provider(&self.id, format!("Failed to parse proxy response: {e}"), None)
        })?;

        let mut builder = TaskResponse::builder(self.id.as_str())
            .result(body.result)
            .cost(body.cost);
        if let Some(cached) = body.cached {
            builder = builder.cached(cached);
        }
        for (key, value) in body.metadata {
            builder = builder.meta(key, value);
        }
        Ok(builder.build())
    }
}

#[derive(Debug, Deserialize)]
struct ProxyResponse {
    result: String,
    #[serde(default)]
    cost: Option<f64>,
    #[serde(default)]
    cached: Option<bool>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}
