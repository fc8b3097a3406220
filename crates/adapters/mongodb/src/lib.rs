//! # Analytics MongoDB Adapter
//!
//! Document-store backend for analytics webhooks. Each record is stored in
//! the `analytics` collection with `_id` set to its `requestId`, and every
//! write is a `replace_one` upsert so redeliveries overwrite in place.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use analytics_adapter_mongodb::MongoAnalyticsWriter;
//!
//! let writer = MongoAnalyticsWriter::connect("mongodb://localhost:27017", "analytics").await?;
//! let service = AnalyticsWebhookService::new(validator, Arc::new(writer));
//! ```

use analytics_webhooks::{
    ANALYTICS_COLLECTION, AnalyticsDocument, AnalyticsRecord, AnalyticsWriter, WebhookError,
    WebhookResult,
};
use async_trait::async_trait;
use mongodb::bson::{self, Document, doc};
use mongodb::options::ReplaceOptions;
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

/// Analytics writer backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoAnalyticsWriter {
    collection: Collection<Document>,
}

impl MongoAnalyticsWriter {
    /// Connects to `uri`, pings the server and uses `database`.
    pub async fn connect(uri: &str, database: &str) -> WebhookResult<Self> {
        info!("Initializing MongoDB connection for database {}", database);

        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| WebhookError::storage(format!("Failed to create MongoDB client: {}", e)))?;

        let database = client.database(database);
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| WebhookError::storage(format!("MongoDB connection test failed: {}", e)))?;

        info!("MongoDB connection established");
        Ok(Self::from_database(&database))
    }

    /// Uses the `analytics` collection of an existing database handle.
    pub fn from_database(database: &Database) -> Self {
        Self {
            collection: database.collection(ANALYTICS_COLLECTION),
        }
    }
}

#[async_trait]
impl AnalyticsWriter for MongoAnalyticsWriter {
    async fn write(&self, record: &AnalyticsRecord) -> WebhookResult<()> {
        let document = to_document(&AnalyticsDocument::received_now(record.clone()))?;
        let options = ReplaceOptions::builder().upsert(true).build();

        let result = self
            .collection
            .replace_one(doc! { "_id": record.request_id.as_str() }, document, options)
            .await
            .map_err(|e| {
                WebhookError::storage(format!("failed to write analytics to MongoDB: {}", e))
            })?;

        debug!(
            request_id = %record.request_id,
            matched = result.matched_count,
            upserted = result.upserted_id.is_some(),
            "Analytics document written"
        );
        Ok(())
    }
}

/// Converts a stored document to BSON keyed by its request ID.
pub fn to_document(document: &AnalyticsDocument) -> WebhookResult<Document> {
    let mut bson_doc = bson::to_document(document)
        .map_err(|e| WebhookError::storage(format!("failed to encode analytics document: {}", e)))?;
    bson_doc.insert("_id", document.id());
    Ok(bson_doc)
}
