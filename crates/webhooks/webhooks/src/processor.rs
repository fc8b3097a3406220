//! Webhook processing pipeline.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{ProcessingError, ProcessingErrorKind, WebhookError};
use crate::payload::decode_and_validate;
use crate::signature::SignatureValidator;
use crate::storage::AnalyticsWriter;

/// Processes a signed webhook delivery end to end.
#[async_trait]
pub trait WebhookProcessor: Send + Sync {
    /// Verifies, decodes, validates and stores a delivery.
    ///
    /// `signature` must already have any algorithm prefix removed.
    async fn process(&self, payload: &[u8], signature: &str) -> Result<(), ProcessingError>;
}

/// Default pipeline: signature → decode → validate → write.
///
/// The write is the only side effect and runs last, so a failure in any
/// earlier step leaves storage untouched.
pub struct AnalyticsWebhookService {
    validator: Arc<dyn SignatureValidator>,
    writer: Arc<dyn AnalyticsWriter>,
}

impl AnalyticsWebhookService {
    /// Creates a new service from its collaborators.
    pub fn new(validator: Arc<dyn SignatureValidator>, writer: Arc<dyn AnalyticsWriter>) -> Self {
        Self { validator, writer }
    }
}

#[async_trait]
impl WebhookProcessor for AnalyticsWebhookService {
    async fn process(&self, payload: &[u8], signature: &str) -> Result<(), ProcessingError> {
        if let Err(e) = self.validator.validate(payload, signature) {
            error!(error = %e, "webhook validation failed");
            return Err(ProcessingError::new(ProcessingErrorKind::Authentication, e));
        }

        let record = match decode_and_validate(payload) {
            Ok(record) => record,
            Err(e @ WebhookError::MissingField { .. }) => {
                error!(error = %e, "analytics record validation failed");
                return Err(ProcessingError::new(ProcessingErrorKind::Validation, e));
            }
            Err(e) => {
                error!(error = %e, "failed to parse webhook payload");
                return Err(ProcessingError::new(ProcessingErrorKind::Parse, e));
            }
        };

        if let Err(e) = self.writer.write(&record).await {
            error!(error = %e, request_id = %record.request_id, "failed to write analytics");
            return Err(ProcessingError::new(ProcessingErrorKind::Storage, e));
        }

        info!(request_id = %record.request_id, "webhook processed successfully");
        Ok(())
    }
}
