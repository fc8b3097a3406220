//! Analytics storage trait for persistence.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::error::{WebhookError, WebhookResult};
use crate::record::{AnalyticsDocument, AnalyticsRecord};

/// Logical collection every record is written to.
pub const ANALYTICS_COLLECTION: &str = "analytics";

/// Trait for analytics storage backends.
///
/// `write` must be a full overwrite keyed by `record.request_id`: writing the
/// same key twice leaves exactly one document holding the second write.
#[async_trait]
pub trait AnalyticsWriter: Send + Sync {
    /// Upserts the record, stamping it with the server receive time.
    async fn write(&self, record: &AnalyticsRecord) -> WebhookResult<()>;
}

/// In-memory analytics storage for testing and local development.
#[derive(Default)]
pub struct InMemoryAnalyticsStorage {
    documents: RwLock<HashMap<String, AnalyticsDocument>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl InMemoryAnalyticsStorage {
    /// Creates a new in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Gets a stored document by request ID.
    pub async fn get(&self, request_id: &str) -> Option<AnalyticsDocument> {
        self.documents.read().await.get(request_id).cloned()
    }

    /// Number of distinct documents stored.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns true if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Number of successful write calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalyticsWriter for InMemoryAnalyticsStorage {
    async fn write(&self, record: &AnalyticsRecord) -> WebhookResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(WebhookError::storage(format!(
                "failed to write analytics to {}",
                ANALYTICS_COLLECTION
            )));
        }

        let document = AnalyticsDocument::received_now(record.clone());
        let mut documents = self.documents.write().await;
        documents.insert(record.request_id.clone(), document);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
