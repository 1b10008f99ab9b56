//! Provider adapters.
//!
//! Every backend is reached through a [`ProviderAdapter`]. The set of adapter
//! kinds is closed ([`AdapterKind`]), and adapters are looked up by provider
//! id through an [`AdapterSet`].

mod chat;
mod http;
mod image;
mod proxy;

pub use chat::{ChatCompletionsAdapter, ChatCompletionsConfig};
pub use image::ImageUrlAdapter;
pub use proxy::{TrustedProxyAdapter, REQUEST_ID_HEADER};

use async_trait::async_trait;
use gateway_config::{AdapterConfig, ProviderConfig};
use gateway_core::{GatewayError, GatewayResult, TaskRequest, TaskResponse};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Duration;
use tracing::debug;

/// Timeout used by adapters whose configuration carries none
const DEFAULT_ADAPTER_TIMEOUT: Duration = Duration::from_secs(120);

/// Executes tasks against one backend.
///
/// Adapters are stateless with respect to routing: they never touch health
/// records or the registry. Deadlines are enforced by the caller.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
    /// Id of the provider this adapter serves
    fn provider_id(&self) -> &str;

    /// Whether calls go through an intermediary that keeps secrets server-side
    fn proxies_through_trusted_boundary(&self) -> bool {
        false
    }

    /// Execute a task
    async fn execute(&self, request: &TaskRequest) -> GatewayResult<TaskResponse>;
}

/// Placeholder for a provider with no backend wired up yet
#[derive(Debug, Clone)]
pub struct UnimplementedAdapter {
    id: String,
}

impl UnimplementedAdapter {
    /// Create a placeholder adapter
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl ProviderAdapter for UnimplementedAdapter {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, _request: &TaskRequest) -> GatewayResult<TaskResponse> {
        Err(GatewayError::not_implemented(&self.id))
    }
}

/// Closed set of adapter implementations
#[derive(Debug)]
pub enum AdapterKind {
    /// OpenAI-compatible chat completions
    ChatCompletions(ChatCompletionsAdapter),
    /// Template-based media URL
    ImageUrl(ImageUrlAdapter),
    /// Trusted intermediary
    TrustedProxy(TrustedProxyAdapter),
    /// No backend
    Unimplemented(UnimplementedAdapter),
}

impl AdapterKind {
    /// Build the adapter described by a provider's configuration
    ///
    /// # Errors
    /// Returns error if the adapter configuration is unusable
    pub fn from_config(config: &ProviderConfig) -> GatewayResult<Self> {
        let id = config.id.as_str();
        let adapter = match &config.adapter {
            AdapterConfig::ChatCompletions {
                base_url,
                model,
                api_key_env,
                request_timeout,
            } => {
                let mut chat = ChatCompletionsConfig::new(id, base_url, model)
                    .with_cost_per_token(config.cost_per_token)
                    .with_timeout(*request_timeout);
                if let Some(var) = api_key_env {
                    chat = chat.with_api_key_env(var);
                }
                Self::ChatCompletions(ChatCompletionsAdapter::new(chat)?)
            }
            AdapterConfig::ImageUrl { url_template, verify } => Self::ImageUrl(
                ImageUrlAdapter::new(id, url_template, *verify, DEFAULT_ADAPTER_TIMEOUT)?,
            ),
            AdapterConfig::TrustedProxy { endpoint } => Self::TrustedProxy(
                TrustedProxyAdapter::new(id, endpoint, DEFAULT_ADAPTER_TIMEOUT)?,
            ),
            AdapterConfig::Unimplemented => Self::Unimplemented(UnimplementedAdapter::new(id)),
        };
        Ok(adapter)
    }

    /// Short name of the adapter kind
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::ChatCompletions(_) => "chat_completions",
            Self::ImageUrl(_) => "image_url",
            Self::TrustedProxy(_) => "trusted_proxy",
            Self::Unimplemented(_) => "unimplemented",
        }
    }

    fn inner(&self) -> &dyn ProviderAdapter {
        match self {
            Self::ChatCompletions(a) => a,
            Self::ImageUrl(a) => a,
            Self::TrustedProxy(a) => a,
            Self::Unimplemented(a) => a,
        }
    }
}

#[async_trait]
impl ProviderAdapter for AdapterKind {
    fn provider_id(&self) -> &str {
        self.inner().provider_id()
    }

    fn proxies_through_trusted_boundary(&self) -> bool {
        self.inner().proxies_through_trusted_boundary()
    }

    async fn execute(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        self.inner().execute(request).await
    }
}

/// Adapters keyed by provider id
#[derive(Debug, Default)]
pub struct AdapterSet {
    adapters: HashMap<String, AdapterKind>,
}

impl AdapterSet {
    /// Create an empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every configured provider
    ///
    /// # Errors
    /// Returns error if any adapter cannot be constructed
    pub fn from_configs(configs: &[ProviderConfig]) -> GatewayResult<Self> {
        let mut set = Self::new();
        for config in configs {
            let adapter = AdapterKind::from_config(config)?;
            debug!(provider = %config.id, kind = adapter.kind_name(), "Adapter created");
            set.insert(adapter);
        }
        Ok(set)
    }

    /// Add an adapter, keyed by its provider id
    pub fn insert(&mut self, adapter: AdapterKind) {
        self.adapters.insert(adapter.provider_id().to_string(), adapter);
    }

    /// Add an adapter, returning the set
    #[must_use]
    pub fn with(mut self, adapter: AdapterKind) -> Self {
        self.insert(adapter);
        self
    }

    /// Adapter for a provider
    #[must_use]
    pub fn get(&self, provider_id: &str) -> Option<&AdapterKind> {
        self.adapters.get(provider_id)
    }

    /// Number of adapters
    #[must_use]
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_config::default_providers;
    use gateway_core::{ErrorKind, TaskType};

    #[tokio::test]
    async fn test_unimplemented_fails_immediately() {
        let adapter = UnimplementedAdapter::new("video-synth");
        let request = TaskRequest::builder(TaskType::VideoGeneration)
            .prompt("a cat")
            .build()
            .expect("valid request");
        let err = adapter.execute(&request).await.expect_err("placeholder");
        assert_eq!(err.kind(), ErrorKind::NotImplemented);
    }

    #[test]
    fn test_default_catalog_builds_every_adapter() {
        let providers = default_providers();
        let set = AdapterSet::from_configs(&providers).expect("adapters");
        assert_eq!(set.len(), providers.len());
        assert_eq!(set.get("local-llm").map(AdapterKind::kind_name), Some("chat_completions"));
        assert_eq!(set.get("pollinations-image").map(AdapterKind::kind_name), Some("image_url"));
        assert_eq!(set.get("video-synth").map(AdapterKind::kind_name), Some("unimplemented"));
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn test_only_proxy_crosses_trusted_boundary() {
        let set = AdapterSet::new()
            .with(AdapterKind::Unimplemented(UnimplementedAdapter::new("u")))
            .with(AdapterKind::TrustedProxy(
                TrustedProxyAdapter::new("p", "http://proxy.internal/tasks", Duration::from_secs(1))
                    .expect("adapter"),
            ));
        assert!(!set.get("u").expect("u").proxies_through_trusted_boundary());
        assert!(set.get("p").expect("p").proxies_through_trusted_boundary());
    }
}
