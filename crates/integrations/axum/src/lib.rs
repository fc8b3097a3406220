//! # Analytics Webhooks Axum Integration
//!
//! This crate exposes the analytics webhook pipeline over HTTP:
//! - Route mounting
//! - Process-wide rate limiting ahead of body reads
//! - Error-to-status mapping
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use analytics_axum::{webhook_routes, WebhookState};
//!
//! let state = WebhookState::new(Arc::new(service))
//!     .with_rate_limiter(Arc::new(WebhookRateLimiter::new()));
//!
//! let app: Router = webhook_routes("/webhook", state);
//! ```

mod routes;

pub use routes::{
    DEFAULT_MAX_BODY_BYTES, SIGNATURE_HEADER, WebhookAck, WebhookState, webhook_routes,
};

use analytics_webhooks::ProcessingError;
use axum::http::header::{HeaderName, HeaderValue, RETRY_AFTER};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Non-standard retry hint sent alongside `Retry-After`.
pub const X_RATELIMIT_RETRY_AFTER: HeaderName = HeaderName::from_static("x-ratelimit-retry-after");

/// Reasons a webhook request is rejected.
///
/// Every processing failure maps to 401 so a caller cannot tell which check
/// failed from the status code.
#[derive(Debug, Error)]
pub enum ReceiveError {
    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    /// The request body could not be read.
    #[error("failed to read body: {0}")]
    BodyRead(String),

    /// Signature header absent or empty.
    #[error("missing X-Webhook-Signature header")]
    MissingSignature,

    /// The processor rejected the delivery.
    #[error("failed to process webhook: {0}")]
    Processing(#[from] ProcessingError),
}

impl ReceiveError {
    /// HTTP status for this rejection.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ReceiveError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ReceiveError::BodyRead(_) => StatusCode::BAD_REQUEST,
            ReceiveError::MissingSignature => StatusCode::BAD_REQUEST,
            ReceiveError::Processing(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ReceiveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ReceiveError::RateLimited { retry_after_secs } => {
                let retry = HeaderValue::from(retry_after_secs);
                (
                    status,
                    [(RETRY_AFTER, retry.clone()), (X_RATELIMIT_RETRY_AFTER, retry)],
                    "Rate limit exceeded",
                )
                    .into_response()
            }
            ReceiveError::BodyRead(_) => (status, "Failed to read body").into_response(),
            ReceiveError::MissingSignature => {
                (status, "Missing X-Webhook-Signature header").into_response()
            }
            ReceiveError::Processing(_) => (status, "Failed to process webhook").into_response(),
        }
    }
}
