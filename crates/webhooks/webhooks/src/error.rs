//! Webhook error types.

use thiserror::Error;

/// Result type for webhook operations.
pub type WebhookResult<T> = Result<T, WebhookError>;

/// Error type for webhook operations.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature missing or does not match the payload.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Payload is not a well-formed webhook envelope.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// A required record field is empty or zero.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// Storage backend rejected the write.
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Too many requests have been admitted.
    #[error("Rate limit exceeded. Try again in {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },
}

impl WebhookError {
    /// Creates a new storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::StorageError(message.into())
    }

    /// Seconds a rate-limited caller should wait, if this is a rate limit error.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for WebhookError {
    fn from(err: serde_json::Error) -> Self {
        WebhookError::InvalidPayload(err.to_string())
    }
}

/// Pipeline stage at which processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingErrorKind {
    /// Signature verification failed.
    Authentication,
    /// The envelope could not be decoded.
    Parse,
    /// A required field was missing.
    Validation,
    /// The record could not be persisted.
    Storage,
}

impl ProcessingErrorKind {
    fn context(self) -> &'static str {
        match self {
            ProcessingErrorKind::Authentication => "webhook validation failed",
            ProcessingErrorKind::Parse => "failed to parse webhook",
            ProcessingErrorKind::Validation => "invalid analytics record",
            ProcessingErrorKind::Storage => "failed to store analytics",
        }
    }
}

/// Error returned by a [`WebhookProcessor`](crate::WebhookProcessor).
///
/// Wraps the underlying [`WebhookError`] together with the stage that
/// produced it. Transport layers are expected to collapse every kind to the
/// same client-facing status.
#[derive(Debug, Error)]
#[error("{}: {source}", .kind.context())]
pub struct ProcessingError {
    kind: ProcessingErrorKind,
    #[source]
    source: WebhookError,
}

impl ProcessingError {
    /// Creates a processing error for the given stage.
    pub fn new(kind: ProcessingErrorKind, source: WebhookError) -> Self {
        Self { kind, source }
    }

    /// Returns the stage that failed.
    pub fn kind(&self) -> ProcessingErrorKind {
        self.kind
    }

    /// Returns the underlying cause.
    pub fn cause(&self) -> &WebhookError {
        &self.source
    }
}
