//! Route mounting for the analytics webhook endpoint.

use analytics_webhooks::{WebhookProcessor, WebhookRateLimiter, strip_signature_prefix};
use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::post;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ReceiveError;

/// Header carrying the payload signature, optionally prefixed with `sha256=`.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Default upper bound on request body size (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared state for the webhook route.
#[derive(Clone)]
pub struct WebhookState {
    processor: Arc<dyn WebhookProcessor>,
    rate_limiter: Option<Arc<WebhookRateLimiter>>,
    max_body_bytes: usize,
}

impl WebhookState {
    /// Creates state with no rate limiting and the default body limit.
    pub fn new(processor: Arc<dyn WebhookProcessor>) -> Self {
        Self {
            processor,
            rate_limiter: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Enables admission control ahead of every request.
    pub fn with_rate_limiter(mut self, limiter: Arc<WebhookRateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Sets the maximum accepted body size.
    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

/// Acknowledgment returned for an accepted delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub status: &'static str,
}

impl WebhookAck {
    fn ok() -> Self {
        Self {
            success: true,
            status: "ok",
        }
    }
}

/// Creates an Axum router serving the webhook at `path`.
///
/// Only `POST` is routed; other methods get 405 before any rate limiting
/// or body handling.
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new().merge(webhook_routes("/webhook", state));
/// ```
pub fn webhook_routes<S>(path: &str, state: WebhookState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route(path, post(webhook_handler))
        .with_state(state)
}

/// Rate check → body read → signature header → processor.
async fn webhook_handler(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Body,
) -> Result<Json<WebhookAck>, ReceiveError> {
    if let Some(limiter) = &state.rate_limiter {
        if let Err(e) = limiter.acquire().await {
            info!(error = %e, "rate limit exceeded");
            return Err(ReceiveError::RateLimited {
                retry_after_secs: e.retry_after_secs().unwrap_or(1),
            });
        }
    }

    let body = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| {
            error!(error = %e, "failed to read request body");
            ReceiveError::BodyRead(e.to_string())
        })?;

    let signature = extract_signature(&headers).ok_or_else(|| {
        info!("missing webhook signature header");
        ReceiveError::MissingSignature
    })?;

    debug!(bytes = body.len(), "Received webhook");

    if let Err(e) = state.processor.process(&body, signature).await {
        warn!(error = %e, kind = ?e.kind(), "failed to process webhook");
        return Err(ReceiveError::Processing(e));
    }

    Ok(Json(WebhookAck::ok()))
}

/// Reads the signature header and strips any algorithm prefix.
///
/// Returns `None` when the header is absent, empty or not valid UTF-8.
fn extract_signature(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(strip_signature_prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_signature_strips_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("sha256=abc123"));
        assert_eq!(extract_signature(&headers), Some("abc123"));
    }

    #[test]
    fn test_extract_signature_bare() {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static("abc123"));
        assert_eq!(extract_signature(&headers), Some("abc123"));
    }

    #[test]
    fn test_extract_signature_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_signature(&headers), None);

        headers.insert(SIGNATURE_HEADER, HeaderValue::from_static(""));
        assert_eq!(extract_signature(&headers), None);
    }

    #[test]
    fn test_ack_field_order() {
        let body = serde_json::to_string(&WebhookAck::ok()).unwrap();
        assert_eq!(body, r#"{"success":true,"status":"ok"}"#);
    }
}
