//! Request orchestration.
//!
//! A routing call walks: batch check, candidate selection, safety filter,
//! scoring, then the attempt loop. Provider failures never escape; when every
//! attempt fails the failsafe response is returned instead.

use crate::batch::BatchQueue;
use crate::failsafe::FailsafeResponder;
use crate::profiles::{TaskProfile, TaskProfileTable};
use crate::scorer::{RankedProvider, Scorer, ScoringWeights};
use chrono::Utc;
use gateway_config::GatewayConfig;
use gateway_core::{
    ExecutionContext, GatewayError, GatewayResult, LayerMarker, ProviderDescriptor, TaskRequest,
    TaskResponse, TaskType,
};
use gateway_providers::{AdapterSet, ProviderAdapter, ProviderRegistry};
use gateway_resilience::{run_with_timeout, CircuitBreakerConfig, HealthTracker, TimeoutPolicy};
use gateway_telemetry::{RouteOutcome, RoutingMetrics, TelemetryEvent, TelemetryLog};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Routing options
#[derive(Debug, Clone)]
pub struct RoutingOptions {
    /// Maximum provider attempts per request
    pub max_fallback_hops: usize,
    /// Where the gateway runs
    pub execution_context: ExecutionContext,
    /// Attempt deadlines and the batch threshold
    pub timeouts: TimeoutPolicy,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            max_fallback_hops: 3,
            execution_context: ExecutionContext::Trusted,
            timeouts: TimeoutPolicy::default(),
        }
    }
}

/// The routing gateway
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<ProviderRegistry>,
    health: Arc<HealthTracker>,
    adapters: AdapterSet,
    scorer: Scorer,
    profiles: TaskProfileTable,
    batch: BatchQueue,
    failsafe: FailsafeResponder,
    telemetry: Arc<TelemetryLog>,
    metrics: RoutingMetrics,
    options: RoutingOptions,
}

impl Gateway {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Build a gateway from validated configuration
    ///
    /// # Errors
    /// Returns error if an adapter, the job store or the metrics registry
    /// cannot be created
    pub async fn from_config(config: &GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;

        let gateway = Self::builder()
            .registry(ProviderRegistry::from_configs(&config.providers))
            .adapters(AdapterSet::from_configs(&config.providers)?)
            .health(HealthTracker::new(CircuitBreakerConfig {
                failure_threshold: config.circuit_breaker.failure_threshold,
                cooldown: config.circuit_breaker.cooldown,
            }))
            .weights(ScoringWeights::from_settings(&config.scoring)?)
            .batch_queue(BatchQueue::from_settings(&config.batch.store).await?)
            .telemetry_capacity(config.telemetry.capacity)
            .options(RoutingOptions {
                max_fallback_hops: config.routing.max_fallback_hops,
                execution_context: config.routing.execution_context,
                timeouts: TimeoutPolicy::new(
                    config.timeouts.realtime,
                    config.timeouts.complex,
                    config.timeouts.batch,
                ),
            })
            .build()?;

        info!(
            providers = gateway.registry.len(),
            execution_context = ?gateway.options.execution_context,
            max_fallback_hops = gateway.options.max_fallback_hops,
            "Gateway initialized"
        );
        Ok(gateway)
    }

    /// Route a task to the best available provider.
    ///
    /// # Errors
    /// Returns error only for invalid input: an empty or oversized prompt, or
    /// a batch-eligible task without caller identity. Provider failures end in
    /// the failsafe response instead.
    #[instrument(skip(self, request), fields(task_id = %request.id, task_type = %request.task_type))]
    pub async fn route_request(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        if let Err(error) = request.validate() {
            self.metrics.record_route(RouteOutcome::Rejected);
            return Err(error);
        }

        self.telemetry.record(TelemetryEvent::RequestStart {
            task_id: request.id,
            task_type: request.task_type,
            timestamp: Utc::now(),
        });

        let profile = self.profiles.profile(request.task_type);
        if self.options.timeouts.is_batch(profile.max_latency) {
            return self.submit_batch(request).await;
        }

        let ranked = self.rank_candidates(profile);
        debug!(
            candidates = ranked.len(),
            capability = %profile.capability,
            "Candidates ranked"
        );

        let attempt_timeout = self.options.timeouts.attempt_timeout(profile.max_latency);
        let mut hops = 0;
        let mut last_failed: Option<String> = None;
        let mut last_error: Option<GatewayError> = None;

        for candidate in ranked {
            if hops >= self.options.max_fallback_hops {
                debug!(hops, "Fallback hop limit reached");
                break;
            }

            let id = candidate.descriptor.id.as_str();
            if !self.health.try_acquire(id) {
                debug!(provider = %id, "Skipping provider with open circuit");
                continue;
            }

            if let Some(from_provider) = last_failed.take() {
                self.telemetry.record(TelemetryEvent::Fallback {
                    task_id: request.id,
                    from_provider,
                    hop: hops,
                    timestamp: Utc::now(),
                });
            }
            self.telemetry.record(TelemetryEvent::ProviderSelected {
                task_id: request.id,
                provider: id.to_string(),
                score: candidate.score.composite,
                hop: hops,
                timestamp: Utc::now(),
            });

            let started = Instant::now();
            let outcome = self.attempt(id, request, attempt_timeout).await;
            let elapsed = started.elapsed();
            hops += 1;

            match outcome {
                Ok(response) => {
                    return Ok(self.complete(request, profile, &candidate, response, elapsed, hops));
                }
                Err(error) => {
                    self.handle_failure(request, &candidate.descriptor, &error);
                    last_failed = Some(id.to_string());
                    last_error = Some(error);
                }
            }
        }

        Ok(self.failsafe(request, hops, last_error.as_ref()))
    }

    /// Enabled providers able to serve a task, after the safety filter,
    /// best first
    #[must_use]
    pub fn candidates(&self, task: TaskType) -> Vec<RankedProvider> {
        self.rank_candidates(self.profiles.profile(task))
    }

    fn rank_candidates(&self, profile: &TaskProfile) -> Vec<RankedProvider> {
        let eligible: Vec<ProviderDescriptor> = self
            .registry
            .list_by_capability(profile.capability)
            .into_iter()
            .filter(|descriptor| self.passes_safety_filter(descriptor))
            .collect();
        self.scorer.rank(eligible, &self.health, profile.capability)
    }

    /// In an untrusted context, providers needing server-held secrets are only
    /// eligible behind a trusted proxy
    fn passes_safety_filter(&self, descriptor: &ProviderDescriptor) -> bool {
        match self.options.execution_context {
            ExecutionContext::Trusted => true,
            ExecutionContext::Untrusted => {
                let allowed = !descriptor.requires_server_side
                    || self
                        .adapters
                        .get(&descriptor.id)
                        .is_some_and(ProviderAdapter::proxies_through_trusted_boundary);
                if !allowed {
                    debug!(provider = %descriptor.id, "Provider filtered in untrusted context");
                }
                allowed
            }
        }
    }

    async fn attempt(
        &self,
        id: &str,
        request: &TaskRequest,
        timeout: Duration,
    ) -> GatewayResult<TaskResponse> {
        let Some(adapter) = self.adapters.get(id) else {
            warn!(provider = %id, "No adapter registered for provider");
            return Err(GatewayError::not_implemented(id));
        };
        run_with_timeout(id, timeout, adapter.execute(request)).await
    }

    fn complete(
        &self,
        request: &TaskRequest,
        profile: &TaskProfile,
        candidate: &RankedProvider,
        mut response: TaskResponse,
        elapsed: Duration,
        hops: usize,
    ) -> TaskResponse {
        let id = candidate.descriptor.id.as_str();
        self.health.report_success(id, elapsed);
        self.metrics.record_attempt_success(id, elapsed);
        self.metrics.record_route(RouteOutcome::Success);

        let latency_ms = elapsed.as_millis() as u64;
        self.telemetry.record(TelemetryEvent::Success {
            task_id: request.id,
            provider: id.to_string(),
            latency_ms,
            timestamp: Utc::now(),
        });

        response.provider_id = id.to_string();
        response.layer = LayerMarker::Layer(candidate.descriptor.layer);
        response.latency_ms = latency_ms;
        response.metadata.insert("attempts".to_string(), hops.into());
        response
            .metadata
            .insert("score".to_string(), candidate.score.composite.into());
        response.metadata.insert(
            "latency_class".to_string(),
            self.options.timeouts.classify(profile.max_latency).as_str().into(),
        );

        info!(provider = %id, latency_ms, attempts = hops, "Task routed");
        response
    }

    fn handle_failure(&self, request: &TaskRequest, descriptor: &ProviderDescriptor, error: &GatewayError) {
        let id = descriptor.id.as_str();
        let critical = error.is_auth_error();
        self.health.report_failure(id, critical);
        self.metrics.record_attempt_failure(id, error.kind().as_str());

        if critical {
            if let Err(e) = self.registry.set_enabled(id, false, Some(&error.to_string())) {
                warn!(provider = %id, error = %e, "Failed to disable provider");
            }
        }

        warn!(provider = %id, error = %error, critical, "Provider attempt failed");
        self.telemetry.record(TelemetryEvent::Failure {
            task_id: request.id,
            provider: id.to_string(),
            error_kind: error.kind().as_str().to_string(),
            message: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    async fn submit_batch(&self, request: &TaskRequest) -> GatewayResult<TaskResponse> {
        match self.batch.submit(request).await {
            Ok(response) => {
                self.metrics.record_route(RouteOutcome::Batched);
                if let Some(job_id) = response.meta("job_id").and_then(|v| v.as_str()) {
                    self.telemetry.record(TelemetryEvent::BatchQueued {
                        task_id: request.id,
                        job_id: job_id.to_string(),
                        timestamp: Utc::now(),
                    });
                }
                Ok(response)
            }
            Err(error) => {
                self.metrics.record_route(RouteOutcome::Rejected);
                warn!(error = %error, "Batch submission rejected");
                Err(error)
            }
        }
    }

    fn failsafe(&self, request: &TaskRequest, hops: usize, error: Option<&GatewayError>) -> TaskResponse {
        let reason = error.map_or_else(
            || "no eligible provider".to_string(),
            ToString::to_string,
        );
        warn!(attempts = hops, reason = %reason, "All providers failed, returning failsafe response");

        self.metrics.record_route(RouteOutcome::Failsafe);
        self.telemetry.record(TelemetryEvent::Failsafe {
            task_id: request.id,
            task_type: request.task_type,
            reason,
            timestamp: Utc::now(),
        });
        self.failsafe.response(request.task_type, error)
    }

    /// Provider registry
    #[must_use]
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Health tracker
    #[must_use]
    pub fn health(&self) -> &Arc<HealthTracker> {
        &self.health
    }

    /// Telemetry log
    #[must_use]
    pub fn telemetry(&self) -> &Arc<TelemetryLog> {
        &self.telemetry
    }

    /// Batch queue
    #[must_use]
    pub fn batch_queue(&self) -> &BatchQueue {
        &self.batch
    }

    /// Routing metrics
    #[must_use]
    pub fn metrics(&self) -> &RoutingMetrics {
        &self.metrics
    }

    /// Task profiles
    #[must_use]
    pub fn profiles(&self) -> &TaskProfileTable {
        &self.profiles
    }

    /// Routing options
    #[must_use]
    pub fn options(&self) -> &RoutingOptions {
        &self.options
    }
}

/// Builder for `Gateway`
#[derive(Debug, Default)]
pub struct GatewayBuilder {
    registry: Option<Arc<ProviderRegistry>>,
    health: Option<Arc<HealthTracker>>,
    adapters: Option<AdapterSet>,
    weights: Option<ScoringWeights>,
    profiles: Option<TaskProfileTable>,
    batch: Option<BatchQueue>,
    failsafe: Option<FailsafeResponder>,
    telemetry_capacity: Option<usize>,
    options: Option<RoutingOptions>,
}

impl GatewayBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider registry
    #[must_use]
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Set the health tracker
    #[must_use]
    pub fn health(mut self, health: HealthTracker) -> Self {
        self.health = Some(Arc::new(health));
        self
    }

    /// Share an existing health tracker
    #[must_use]
    pub fn shared_health(mut self, health: Arc<HealthTracker>) -> Self {
        self.health = Some(health);
        self
    }

    /// Set the adapters
    #[must_use]
    pub fn adapters(mut self, adapters: AdapterSet) -> Self {
        self.adapters = Some(adapters);
        self
    }

    /// Set the scoring weights
    #[must_use]
    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Set the task profiles
    #[must_use]
    pub fn profiles(mut self, profiles: TaskProfileTable) -> Self {
        self.profiles = Some(profiles);
        self
    }

    /// Set the batch queue
    #[must_use]
    pub fn batch_queue(mut self, batch: BatchQueue) -> Self {
        self.batch = Some(batch);
        self
    }

    /// Set the failsafe responder
    #[must_use]
    pub fn failsafe(mut self, failsafe: FailsafeResponder) -> Self {
        self.failsafe = Some(failsafe);
        self
    }

    /// Set the telemetry log capacity
    #[must_use]
    pub fn telemetry_capacity(mut self, capacity: usize) -> Self {
        self.telemetry_capacity = Some(capacity);
        self
    }

    /// Set the routing options
    #[must_use]
    pub fn options(mut self, options: RoutingOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Set the fallback hop limit
    #[must_use]
    pub fn max_fallback_hops(mut self, hops: usize) -> Self {
        self.options.get_or_insert_with(RoutingOptions::default).max_fallback_hops = hops;
        self
    }

    /// Set the execution context
    #[must_use]
    pub fn execution_context(mut self, context: ExecutionContext) -> Self {
        self.options.get_or_insert_with(RoutingOptions::default).execution_context = context;
        self
    }

    /// Build the gateway
    ///
    /// # Errors
    /// Returns error if the hop limit is zero or the metrics registry cannot
    /// be created
    pub fn build(self) -> GatewayResult<Gateway> {
        let options = self.options.unwrap_or_default();
        if options.max_fallback_hops == 0 {
            return Err(GatewayError::configuration("max_fallback_hops must be at least 1"));
        }
        let metrics = RoutingMetrics::new()
            .map_err(|e| GatewayError::internal(format!("Failed to create metrics: {e}")))?;

        Ok(Gateway {
            registry: self.registry.unwrap_or_default(),
            health: self.health.unwrap_or_default(),
            adapters: self.adapters.unwrap_or_default(),
            scorer: Scorer::new(self.weights.unwrap_or_default()),
            profiles: self.profiles.unwrap_or_default(),
            batch: self.batch.unwrap_or_else(BatchQueue::in_memory),
            failsafe: self.failsafe.unwrap_or_default(),
            telemetry: Arc::new(TelemetryLog::new(
                self.telemetry_capacity
                    .unwrap_or(gateway_telemetry::DEFAULT_CAPACITY),
            )),
            metrics,
            options,
        })
    }
}
