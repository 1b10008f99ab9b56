//! Response types for the gateway.

use crate::types::LayerMarker;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Unified task response.
///
/// `result` is interpreted by the caller according to the task type: text,
/// a media URL, or a batch ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    /// Result payload
    pub result: String,
    /// Provider that produced the result
    pub provider_id: String,
    /// Layer marker of the producing provider
    pub layer: LayerMarker,
    /// Wall-clock latency of the successful attempt in milliseconds
    pub latency_ms: u64,
    /// Cost of the call in USD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Whether the result was served from a cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached: Option<bool>,
    /// Free-form metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl TaskResponse {
    /// Create a new builder
    #[must_use]
    pub fn builder(provider_id: impl Into<String>) -> TaskResponseBuilder {
        TaskResponseBuilder::new(provider_id)
    }

    /// Look up a metadata entry
    #[must_use]
    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// Whether this is the router's degraded terminal response
    #[must_use]
    pub fn is_failsafe(&self) -> bool {
        self.meta("failsafe").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Builder for `TaskResponse`
#[derive(Debug, Clone)]
pub struct TaskResponseBuilder {
    response: TaskResponse,
}

impl TaskResponseBuilder {
    fn new(provider_id: impl Into<String>) -> Self {
        Self {
            response: TaskResponse {
                result: String::new(),
                provider_id: provider_id.into(),
                layer: LayerMarker::default(),
                latency_ms: 0,
                cost: None,
                cached: None,
                metadata: HashMap::new(),
            },
        }
    }

    /// Set the result payload
    #[must_use]
    pub fn result(mut self, result: impl Into<String>) -> Self {
        self.response.result = result.into();
        self
    }

    /// Set the layer marker
    #[must_use]
    pub fn layer(mut self, layer: LayerMarker) -> Self {
        self.response.layer = layer;
        self
    }

    /// Set the latency
    #[must_use]
    pub fn latency_ms(mut self, latency_ms: u64) -> Self {
        self.response.latency_ms = latency_ms;
        self
    }

    /// Set the cost
    #[must_use]
    pub fn cost(mut self, cost: Option<f64>) -> Self {
        self.response.cost = cost;
        self
    }

    /// Set the cached flag
    #[must_use]
    pub fn cached(mut self, cached: bool) -> Self {
        self.response.cached = Some(cached);
        self
    }

    /// Add a metadata entry
    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.response.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the response
    #[must_use]
    pub fn build(self) -> TaskResponse {
        self.response
    }
}
