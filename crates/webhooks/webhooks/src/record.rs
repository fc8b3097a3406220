//! Analytics record and webhook envelope types.

use serde::{Deserialize, Deserializer, Serialize};

/// A single analytics event, keyed by `request_id`.
///
/// Absent or `null` fields decode to their zero value; required-field checks
/// happen afterwards in [`validate_record`](crate::validate_record).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsRecord {
    /// Natural key. Used as the storage document ID.
    #[serde(deserialize_with = "nullable")]
    pub request_id: String,
    /// Free-text query.
    #[serde(deserialize_with = "nullable")]
    pub query: String,
    #[serde(deserialize_with = "nullable")]
    pub match_type: String,
    #[serde(deserialize_with = "nullable")]
    pub match_score: i64,
    #[serde(deserialize_with = "nullable")]
    pub reasoning: String,
    #[serde(deserialize_with = "nullable")]
    pub vector_matches: i64,
    #[serde(deserialize_with = "nullable")]
    pub session_id: String,
    #[serde(deserialize_with = "nullable")]
    pub week: String,
    /// Caller-supplied event time (Unix seconds).
    #[serde(deserialize_with = "nullable")]
    pub timestamp: i64,
}

impl AnalyticsRecord {
    /// Creates a record with the required fields set.
    pub fn new(request_id: impl Into<String>, query: impl Into<String>, timestamp: i64) -> Self {
        Self {
            request_id: request_id.into(),
            query: query.into(),
            timestamp,
            ..Self::default()
        }
    }
}

/// Wire envelope delivered to the webhook endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookPayload {
    /// Event type.
    #[serde(deserialize_with = "nullable")]
    pub event_type: String,
    /// Envelope timestamp.
    #[serde(deserialize_with = "nullable")]
    pub timestamp: i64,
    /// Embedded record.
    #[serde(deserialize_with = "nullable")]
    pub data: AnalyticsRecord,
}

/// Stored form of an [`AnalyticsRecord`].
///
/// Every write replaces the whole document, so `received_at` always belongs
/// to the most recent delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDocument {
    #[serde(flatten)]
    pub record: AnalyticsRecord,
    /// Server time the record was written (Unix seconds).
    pub received_at: i64,
}

impl AnalyticsDocument {
    /// Stamps a record with the current server time.
    pub fn received_now(record: AnalyticsRecord) -> Self {
        Self::new(record, chrono::Utc::now().timestamp())
    }

    /// Creates a document with an explicit receive time.
    pub fn new(record: AnalyticsRecord, received_at: i64) -> Self {
        Self {
            record,
            received_at,
        }
    }

    /// Document key.
    pub fn id(&self) -> &str {
        &self.record.request_id
    }
}

/// Treats an explicit JSON `null` like an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
