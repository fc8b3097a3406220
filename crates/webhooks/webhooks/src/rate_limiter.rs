//! Rate Limiter for the Webhook Endpoint
//!
//! Provides a single process-wide token bucket:
//! - Configurable requests per second
//! - Burst capacity
//! - Continuous token refill
//!
//! Requests over the limit are rejected immediately; nothing is queued.

use crate::{WebhookError, WebhookResult};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Admission control shared by all requests.
pub struct WebhookRateLimiter {
    bucket: Mutex<TokenBucket>,
    limit: RateLimit,
}

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Tokens refilled per second
    pub requests_per_second: u32,

    /// Burst capacity (max tokens in bucket)
    pub burst: u32,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_second: 100,
            burst: 20,
        }
    }
}

/// Token bucket state
struct TokenBucket {
    /// Current number of tokens, fractional between refills
    tokens: f64,

    /// Last time tokens were refilled
    last_refill: Instant,
}

impl WebhookRateLimiter {
    /// Create a new rate limiter with default limits
    pub fn new() -> Self {
        Self::with_limit(RateLimit::default())
    }

    /// Create a rate limiter with a custom limit. The bucket starts full.
    pub fn with_limit(limit: RateLimit) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket {
                tokens: limit.burst as f64,
                last_refill: Instant::now(),
            }),
            limit,
        }
    }

    /// Take one token.
    ///
    /// Returns [`WebhookError::RateLimited`] with a retry hint if the bucket
    /// is empty.
    pub async fn acquire(&self) -> WebhookResult<()> {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(&self.limit);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            return Ok(());
        }

        Err(WebhookError::RateLimited {
            retry_after_secs: bucket.retry_after_secs(&self.limit),
        })
    }

    /// Get current rate limit info
    pub async fn info(&self) -> RateLimitInfo {
        let mut bucket = self.bucket.lock().await;
        bucket.refill(&self.limit);

        RateLimitInfo {
            capacity: self.limit.burst,
            available_tokens: bucket.tokens.floor() as u32,
            refill_rate: self.limit.requests_per_second,
        }
    }
}

impl Default for WebhookRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBucket {
    /// Refill tokens based on elapsed time
    fn refill(&mut self, limit: &RateLimit) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * limit.requests_per_second as f64)
            .min(limit.burst as f64);
        self.last_refill = now;
    }

    /// Whole seconds until the next token, at least one
    fn retry_after_secs(&self, limit: &RateLimit) -> u64 {
        if limit.requests_per_second == 0 {
            return 1;
        }

        let missing = 1.0 - self.tokens;
        let secs = (missing / limit.requests_per_second as f64).ceil() as u64;
        secs.max(1)
    }
}

/// Information about current rate limits
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub capacity: u32,
    pub available_tokens: u32,
    pub refill_rate: u32,
}
