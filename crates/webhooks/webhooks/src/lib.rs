//! # Analytics Webhooks
//!
//! Core pipeline for receiving signed analytics webhooks:
//! - HMAC-SHA256 signature verification
//! - Envelope decoding and required-field validation
//! - Idempotent, keyed storage behind a pluggable writer
//! - Process-wide token bucket admission control
//!
//! ## Example
//!
//! ```rust,ignore
//! use analytics_webhooks::{AnalyticsWebhookService, HmacValidator, InMemoryAnalyticsStorage, WebhookProcessor};
//! use std::sync::Arc;
//!
//! let storage = Arc::new(InMemoryAnalyticsStorage::new());
//! let service = AnalyticsWebhookService::new(Arc::new(HmacValidator::new("secret")), storage);
//!
//! service.process(body, signature).await?;
//! ```

mod error;
mod payload;
mod processor;
mod record;
mod signature;
mod storage;
pub mod rate_limiter;

pub use error::{ProcessingError, ProcessingErrorKind, WebhookError, WebhookResult};
pub use payload::{decode_and_validate, validate_record};
pub use processor::{AnalyticsWebhookService, WebhookProcessor};
pub use record::{AnalyticsDocument, AnalyticsRecord, WebhookPayload};
pub use signature::{HmacValidator, SignatureValidator, SHA256_PREFIX, strip_signature_prefix};
pub use storage::{ANALYTICS_COLLECTION, AnalyticsWriter, InMemoryAnalyticsStorage};
pub use rate_limiter::{RateLimit, RateLimitInfo, WebhookRateLimiter};
