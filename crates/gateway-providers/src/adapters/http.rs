//! HTTP plumbing shared by the network adapters.

use gateway_core::{GatewayError, GatewayResult};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Longest error body excerpt carried in an error message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Build an HTTP client with the given per-request timeout
pub(crate) fn build_client(timeout: Duration) -> GatewayResult<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(16)
        .build()
        .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
}

/// Map a transport-level failure
pub(crate) fn map_transport_error(provider: &str, error: &reqwest::Error, timeout: Duration) -> GatewayError {
    if error.is_timeout() {
        GatewayError::timeout(provider, timeout)
    } else if error.is_connect() {
        GatewayError::offline(provider, error.to_string())
    } else {
        GatewayError::provider(provider, format!("Request failed: {error}"), None)
    }
}

/// Map a non-success HTTP status
pub(crate) fn map_status_error(
    provider: &str,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> GatewayError {
    let message = error_message(body);
    match status.as_u16() {
        401 | 403 => GatewayError::authentication(provider, message),
        402 => GatewayError::quota_exceeded(provider, message),
        429 => GatewayError::rate_limit(provider, retry_after),
        code => GatewayError::provider(provider, format!("HTTP {status}: {message}"), Some(code)),
    }
}

/// Turn a non-success response into an error, consuming its body
pub(crate) async fn error_from_response(provider: &str, response: Response) -> GatewayError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();
    map_status_error(provider, status, retry_after, &body)
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Detailed { message: String },
    Plain(String),
}

/// Extract a readable message from an error body
fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return match envelope.error {
            ErrorBody::Detailed { message } | ErrorBody::Plain(message) => message,
        };
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty error body".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}
