//! Payload decoding and required-field validation.

use crate::error::{WebhookError, WebhookResult};
use crate::record::{AnalyticsRecord, WebhookPayload};

/// Decodes a raw webhook body and returns the validated record.
///
/// A malformed envelope yields [`WebhookError::InvalidPayload`]; a record
/// missing a required field yields [`WebhookError::MissingField`].
pub fn decode_and_validate(payload: &[u8]) -> WebhookResult<AnalyticsRecord> {
    let envelope: WebhookPayload = serde_json::from_slice(payload)?;
    validate_record(&envelope.data)?;
    Ok(envelope.data)
}

/// Checks required fields. The first missing field is reported.
pub fn validate_record(record: &AnalyticsRecord) -> WebhookResult<()> {
    if record.request_id.is_empty() {
        return Err(WebhookError::MissingField { field: "requestId" });
    }
    if record.query.is_empty() {
        return Err(WebhookError::MissingField { field: "query" });
    }
    if record.timestamp == 0 {
        return Err(WebhookError::MissingField { field: "timestamp" });
    }
    Ok(())
}
