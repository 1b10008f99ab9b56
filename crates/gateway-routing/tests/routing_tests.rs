//! End-to-end routing tests.
//!
//! Providers are backed by wiremock servers speaking the chat completions
//! protocol; the gateway is assembled through its builder.

use gateway_core::{
    Capability, ErrorKind, ExecutionContext, LayerMarker, ProviderDescriptor, TaskRequest,
    TaskType,
};
use gateway_providers::{
    AdapterKind, AdapterSet, ChatCompletionsAdapter, ChatCompletionsConfig, ProviderRegistry,
    TrustedProxyAdapter, UnimplementedAdapter,
};
use gateway_resilience::{
    CircuitBreakerConfig, CircuitState, Clock, HealthTracker, ManualClock, TimeoutPolicy,
};
use gateway_routing::{BatchQueue, Gateway, RoutingOptions, FAILSAFE_PROVIDER_ID};
use gateway_telemetry::{RouteOutcome, TelemetryEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "model": "mock",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 3, "completion_tokens": 2, "total_tokens": 5}
    })
}

/// Chat adapter for `id`, served under `/{id}` on the mock server
fn chat_adapter(server: &MockServer, id: &str) -> AdapterKind {
    AdapterKind::ChatCompletions(
        ChatCompletionsAdapter::new(
            ChatCompletionsConfig::new(id, format!("{}/{id}", server.uri()), "mock")
                .with_timeout(Duration::from_secs(10)),
        )
        .expect("valid adapter"),
    )
}

async fn mount_reply(server: &MockServer, id: &str, template: ResponseTemplate, calls: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/{id}/chat/completions")))
        .respond_with(template)
        .expect(calls)
        .mount(server)
        .await;
}

fn text_provider(id: &str, layer: u8) -> ProviderDescriptor {
    ProviderDescriptor::new(id, id, layer).with_capability(Capability::Text)
}

fn chat_request(prompt: &str) -> TaskRequest {
    TaskRequest::builder(TaskType::RealtimeChat)
        .prompt(prompt)
        .build()
        .expect("valid request")
}

fn event_types(gateway: &Gateway, request: &TaskRequest) -> Vec<&'static str> {
    gateway
        .telemetry()
        .for_task(request.id)
        .iter()
        .map(TelemetryEvent::event_type)
        .collect()
}

#[cfg(test)]
mod success_tests {
    use super::*;

    #[tokio::test]
    async fn test_single_healthy_provider_answers() {
        let server = MockServer::start().await;
        mount_reply(&server, "solo", ResponseTemplate::new(200).set_body_json(completion("hello")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([text_provider("solo", 2)]))
            .adapters(AdapterSet::new().with(chat_adapter(&server, "solo")))
            .build()
            .expect("gateway");

        let request = chat_request("hi");
        let response = gateway.route_request(&request).await.expect("routed");

        assert_eq!(response.provider_id, "solo");
        assert_eq!(response.result, "hello");
        assert_eq!(response.layer, LayerMarker::Layer(2));
        assert!(!response.is_failsafe());
        assert_eq!(response.meta("attempts"), Some(&json!(1)));
        assert_eq!(response.meta("latency_class"), Some(&json!("realtime")));

        let health = gateway.health().snapshot("solo");
        assert_eq!(health.total_requests, 1);
        assert_eq!(health.consecutive_failures, 0);
        assert!((health.success_rate - 1.0).abs() < 1e-9);
        assert!(health.avg_latency_ms.is_some());

        assert_eq!(
            event_types(&gateway, &request),
            vec!["request_start", "provider_selected", "success"]
        );
        assert_eq!(gateway.metrics().routed_count(RouteOutcome::Success), 1);
    }

    #[tokio::test]
    async fn test_open_circuit_is_skipped_without_attempt() {
        let server = MockServer::start().await;
        mount_reply(&server, "a", ResponseTemplate::new(200).set_body_json(completion("from a")), 0).await;
        mount_reply(&server, "b", ResponseTemplate::new(200).set_body_json(completion("from b")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([
                text_provider("a", 0),
                text_provider("b", 0),
            ]))
            .adapters(
                AdapterSet::new()
                    .with(chat_adapter(&server, "a"))
                    .with(chat_adapter(&server, "b")),
            )
            .build()
            .expect("gateway");

        for _ in 0..3 {
            gateway.health().report_failure("a", false);
        }
        assert_eq!(gateway.health().state("a"), CircuitState::Open);

        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "b");
        assert_eq!(gateway.health().snapshot("a").total_requests, 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_candidate() {
        let server = MockServer::start().await;
        mount_reply(&server, "first", ResponseTemplate::new(503), 1).await;
        mount_reply(&server, "second", ResponseTemplate::new(200).set_body_json(completion("ok")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([
                text_provider("first", 0),
                text_provider("second", 0),
            ]))
            .adapters(
                AdapterSet::new()
                    .with(chat_adapter(&server, "first"))
                    .with(chat_adapter(&server, "second")),
            )
            .build()
            .expect("gateway");

        let request = chat_request("hi");
        let response = gateway.route_request(&request).await.expect("routed");

        assert_eq!(response.provider_id, "second");
        assert_eq!(response.meta("attempts"), Some(&json!(2)));
        assert_eq!(gateway.health().snapshot("first").consecutive_failures, 1);
        assert_eq!(
            event_types(&gateway, &request),
            vec![
                "request_start",
                "provider_selected",
                "failure",
                "fallback",
                "provider_selected",
                "success"
            ]
        );
        assert_eq!(gateway.metrics().attempt_count("first", "provider"), 1);
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_fail_returns_failsafe_within_hop_limit() {
        let server = MockServer::start().await;
        let ids = ["p1", "p2", "p3", "p4"];
        for (i, id) in ids.iter().enumerate() {
            let calls = if i < 3 { 1 } else { 0 };
            mount_reply(&server, id, ResponseTemplate::new(500), calls).await;
        }

        let mut adapters = AdapterSet::new();
        for id in ids {
            adapters.insert(chat_adapter(&server, id));
        }
        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors(
                ids.iter().map(|id| text_provider(id, 0)),
            ))
            .adapters(adapters)
            .max_fallback_hops(3)
            .build()
            .expect("gateway");

        let response = gateway.route_request(&chat_request("hi")).await.expect("failsafe");

        assert!(response.is_failsafe());
        assert_eq!(response.provider_id, FAILSAFE_PROVIDER_ID);
        assert_eq!(response.layer, LayerMarker::Layer(0));
        assert_eq!(response.meta("error_kind"), Some(&json!("provider")));
        for id in &ids[..3] {
            assert_eq!(gateway.health().snapshot(id).total_requests, 1, "{id}");
        }
        assert_eq!(gateway.health().snapshot("p4").total_requests, 0);
        // The failsafe responder itself never appears in health records
        assert_eq!(gateway.health().snapshot(FAILSAFE_PROVIDER_ID).total_requests, 0);
        assert_eq!(gateway.metrics().routed_count(RouteOutcome::Failsafe), 1);
    }

    #[tokio::test]
    async fn test_auth_error_disables_provider() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            "locked",
            ResponseTemplate::new(401).set_body_json(json!({"error": {"message": "bad key"}})),
            1,
        )
        .await;
        mount_reply(&server, "open", ResponseTemplate::new(200).set_body_json(completion("ok")), 2).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([
                text_provider("locked", 0),
                text_provider("open", 0),
            ]))
            .adapters(
                AdapterSet::new()
                    .with(chat_adapter(&server, "locked"))
                    .with(chat_adapter(&server, "open")),
            )
            .build()
            .expect("gateway");

        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "open");

        let locked = gateway.registry().get("locked").expect("registered");
        assert!(!locked.enabled);
        assert!(locked.disabled_reason.is_some());
        assert_eq!(gateway.health().state("locked"), CircuitState::Open);

        // Disabled providers are no longer candidates
        let response = gateway.route_request(&chat_request("again")).await.expect("routed");
        assert_eq!(response.provider_id, "open");
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let server = MockServer::start().await;
        mount_reply(
            &server,
            "slow",
            ResponseTemplate::new(200)
                .set_body_json(completion("late"))
                .set_delay(Duration::from_secs(3)),
            1,
        )
        .await;
        mount_reply(&server, "quick", ResponseTemplate::new(200).set_body_json(completion("fast")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([
                text_provider("slow", 0),
                text_provider("quick", 0),
            ]))
            .adapters(
                AdapterSet::new()
                    .with(chat_adapter(&server, "slow"))
                    .with(chat_adapter(&server, "quick")),
            )
            .options(RoutingOptions {
                timeouts: TimeoutPolicy::new(
                    Duration::from_millis(100),
                    Duration::from_millis(250),
                    Duration::from_secs(300),
                ),
                ..RoutingOptions::default()
            })
            .build()
            .expect("gateway");

        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "quick");
        assert_eq!(gateway.metrics().attempt_count("slow", "timeout"), 1);
    }

    #[tokio::test]
    async fn test_missing_adapter_counts_as_failure() {
        let server = MockServer::start().await;
        mount_reply(&server, "real", ResponseTemplate::new(200).set_body_json(completion("ok")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([
                text_provider("ghost", 0),
                text_provider("real", 0),
            ]))
            .adapters(AdapterSet::new().with(chat_adapter(&server, "real")))
            .build()
            .expect("gateway");

        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "real");
        assert_eq!(gateway.health().snapshot("ghost").consecutive_failures, 1);
        assert_eq!(gateway.metrics().attempt_count("ghost", "not_implemented"), 1);
    }

    #[tokio::test]
    async fn test_no_candidates_returns_failsafe() {
        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([text_provider("text-only", 0)]))
            .build()
            .expect("gateway");

        let request = TaskRequest::builder(TaskType::ImageGeneration)
            .prompt("a lighthouse")
            .build()
            .expect("valid request");
        let response = gateway.route_request(&request).await.expect("failsafe");

        assert!(response.is_failsafe());
        assert!(response.meta("error").is_none());
        assert_eq!(event_types(&gateway, &request), vec!["request_start", "failsafe"]);
    }

    #[tokio::test]
    async fn test_invalid_prompt_is_rejected() {
        let gateway = Gateway::builder().build().expect("gateway");
        let mut request = chat_request("placeholder");
        request.prompt = "   ".to_string();

        let err = gateway.route_request(&request).await.expect_err("invalid");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(gateway.metrics().routed_count(RouteOutcome::Rejected), 1);
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    fn video_gateway(server: &MockServer) -> Gateway {
        Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([ProviderDescriptor::new(
                "video", "Video", 4,
            )
            .with_capability(Capability::Video)]))
            .adapters(AdapterSet::new().with(chat_adapter(server, "video")))
            .build()
            .expect("gateway")
    }

    #[tokio::test]
    async fn test_video_with_identity_is_queued() {
        let server = MockServer::start().await;
        mount_reply(&server, "video", ResponseTemplate::new(200).set_body_json(completion("x")), 0).await;
        let gateway = video_gateway(&server);

        let request = TaskRequest::builder(TaskType::VideoGeneration)
            .prompt("ocean waves at dusk")
            .user_id("user-42")
            .build()
            .expect("valid request");
        let response = gateway.route_request(&request).await.expect("queued");

        assert_eq!(response.layer, LayerMarker::Batch);
        let job_id = BatchQueue::parse_ticket(&response.result).expect("ticket");
        let job = gateway
            .batch_queue()
            .get(job_id)
            .await
            .expect("store")
            .expect("job exists");
        assert_eq!(job.request.prompt, "ocean waves at dusk");
        assert_eq!(gateway.health().snapshot("video").total_requests, 0);
        assert_eq!(event_types(&gateway, &request), vec!["request_start", "batch_queued"]);
    }

    #[tokio::test]
    async fn test_video_without_identity_is_error() {
        let server = MockServer::start().await;
        mount_reply(&server, "video", ResponseTemplate::new(200).set_body_json(completion("x")), 0).await;
        let gateway = video_gateway(&server);

        let request = TaskRequest::builder(TaskType::VideoGeneration)
            .prompt("ocean waves at dusk")
            .build()
            .expect("valid request");
        let err = gateway.route_request(&request).await.expect_err("no identity");

        assert_eq!(err.kind(), ErrorKind::MissingIdentity);
        assert!(gateway.batch_queue().list().await.expect("store").is_empty());
    }

    #[tokio::test]
    async fn test_tasks_below_threshold_never_queue() {
        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([ProviderDescriptor::new(
                "music", "Music", 3,
            )
            .with_capability(Capability::Audio)]))
            .adapters(AdapterSet::new().with(AdapterKind::Unimplemented(UnimplementedAdapter::new(
                "music",
            ))))
            .build()
            .expect("gateway");

        for task in [TaskType::MusicGeneration, TaskType::SpeechSynthesis, TaskType::RealtimeChat] {
            let request = TaskRequest::builder(task)
                .prompt("something")
                .user_id("user-1")
                .build()
                .expect("valid request");
            let response = gateway.route_request(&request).await.expect("routed");
            assert_ne!(response.layer, LayerMarker::Batch, "{task}");
        }
        assert!(gateway.batch_queue().list().await.expect("store").is_empty());
    }
}

#[cfg(test)]
mod safety_tests {
    use super::*;

    #[tokio::test]
    async fn test_untrusted_context_filters_server_side_providers() {
        let server = MockServer::start().await;
        mount_reply(&server, "secret", ResponseTemplate::new(200).set_body_json(completion("no")), 0).await;
        mount_reply(&server, "local", ResponseTemplate::new(200).set_body_json(completion("yes")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([
                text_provider("secret", 0).server_side(),
                text_provider("local", 3),
            ]))
            .adapters(
                AdapterSet::new()
                    .with(chat_adapter(&server, "secret"))
                    .with(chat_adapter(&server, "local")),
            )
            .execution_context(ExecutionContext::Untrusted)
            .build()
            .expect("gateway");

        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "local");
        assert_eq!(response.layer, LayerMarker::Layer(3));
    }

    #[tokio::test]
    async fn test_trusted_proxy_passes_untrusted_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/proxy"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": "via proxy"})))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([text_provider("proxied", 2).server_side()]))
            .adapters(AdapterSet::new().with(AdapterKind::TrustedProxy(
                TrustedProxyAdapter::new("proxied", format!("{}/proxy", server.uri()), Duration::from_secs(5))
                    .expect("adapter"),
            )))
            .execution_context(ExecutionContext::Untrusted)
            .build()
            .expect("gateway");

        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "proxied");
        assert_eq!(response.result, "via proxy");
    }

    #[tokio::test]
    async fn test_trusted_context_allows_everything() {
        let server = MockServer::start().await;
        mount_reply(&server, "secret", ResponseTemplate::new(200).set_body_json(completion("yes")), 1).await;

        let gateway = Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([text_provider("secret", 0).server_side()]))
            .adapters(AdapterSet::new().with(chat_adapter(&server, "secret")))
            .build()
            .expect("gateway");

        assert_eq!(gateway.candidates(TaskType::RealtimeChat).len(), 1);
        let response = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(response.provider_id, "secret");
    }
}

#[cfg(test)]
mod half_open_tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(600);

    fn gateway_with_clock(server: &MockServer, clock: &Arc<ManualClock>) -> Gateway {
        let health = HealthTracker::with_clock(
            CircuitBreakerConfig {
                failure_threshold: 3,
                cooldown: COOLDOWN,
            },
            clock.clone(),
        );
        Gateway::builder()
            .registry(ProviderRegistry::from_descriptors([text_provider("flaky", 0)]))
            .adapters(AdapterSet::new().with(chat_adapter(server, "flaky")))
            .health(health)
            .build()
            .expect("gateway")
    }

    #[tokio::test]
    async fn test_failed_trial_reopens_and_blocks_next_request() {
        let server = MockServer::start().await;
        mount_reply(&server, "flaky", ResponseTemplate::new(503), 1).await;

        let clock = Arc::new(ManualClock::starting_now());
        let gateway = gateway_with_clock(&server, &clock);

        gateway.health().report_failure("flaky", true);
        assert_eq!(gateway.health().state("flaky"), CircuitState::Open);

        clock.advance(COOLDOWN + Duration::from_secs(1));
        assert_eq!(gateway.health().state("flaky"), CircuitState::HalfOpen);

        let trial = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert!(trial.is_failsafe());
        assert_eq!(gateway.health().state("flaky"), CircuitState::Open);
        let cooldown_until = gateway
            .health()
            .snapshot("flaky")
            .cooldown_until
            .expect("cooldown");
        assert!(cooldown_until > clock.now());

        // No second trial inside the fresh cooldown
        let blocked = gateway.route_request(&chat_request("again")).await.expect("routed");
        assert!(blocked.is_failsafe());
        assert_eq!(gateway.metrics().attempt_count("flaky", "provider"), 1);
    }

    #[tokio::test]
    async fn test_successful_trial_closes_breaker() {
        let server = MockServer::start().await;
        mount_reply(&server, "flaky", ResponseTemplate::new(200).set_body_json(completion("back")), 2).await;

        let clock = Arc::new(ManualClock::starting_now());
        let gateway = gateway_with_clock(&server, &clock);

        for _ in 0..3 {
            gateway.health().report_failure("flaky", false);
        }
        assert!(!gateway.health().is_healthy("flaky"));

        clock.advance(COOLDOWN + Duration::from_secs(1));
        let trial = gateway.route_request(&chat_request("hi")).await.expect("routed");
        assert_eq!(trial.provider_id, "flaky");
        assert_eq!(gateway.health().state("flaky"), CircuitState::Closed);
        assert_eq!(gateway.health().snapshot("flaky").consecutive_failures, 0);

        let next = gateway.route_request(&chat_request("again")).await.expect("routed");
        assert_eq!(next.provider_id, "flaky");
    }
}
