//! # Analytics Webhook Server
//!
//! Standalone receiver for signed analytics webhooks. Wires configuration,
//! storage selection, signature validation and admission control into a
//! single Axum router.

mod config;

pub use config::{
    Cli, ConfigError, LogFormat, RateLimitConfig, ServerConfig, StorageBackend, StorageConfig,
    load_config, parse_config,
};

use analytics_adapter_mongodb::MongoAnalyticsWriter;
use analytics_axum::{WebhookState, webhook_routes};
use analytics_webhooks::{
    AnalyticsWebhookService, AnalyticsWriter, HmacValidator, InMemoryAnalyticsStorage,
    WebhookError, WebhookRateLimiter,
};
use axum::Router;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

/// Errors raised while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("storage initialization failed: {0}")]
    Storage(#[from] WebhookError),

    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The analytics webhook server.
pub struct AnalyticsServer {
    config: ServerConfig,
    router: Router,
}

impl AnalyticsServer {
    /// Builds the server, connecting to the configured storage backend.
    pub async fn from_config(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let writer = connect_storage(&config.storage).await?;
        Self::with_writer(config, writer)
    }

    /// Builds the server on top of an existing writer.
    pub fn with_writer(
        config: ServerConfig,
        writer: Arc<dyn AnalyticsWriter>,
    ) -> Result<Self, ServerError> {
        let router = build_router(&config, writer)?;
        Ok(Self { config, router })
    }

    /// Returns a clone of the router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds and serves until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        let address = self.config.bind_address();
        let listener = TcpListener::bind(&address).await?;
        tracing::info!(%address, path = %self.config.path, "listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("server stopped");
        Ok(())
    }
}

/// Opens the configured storage backend.
pub async fn connect_storage(
    config: &StorageConfig,
) -> Result<Arc<dyn AnalyticsWriter>, ServerError> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; records are lost on restart");
            Ok(Arc::new(InMemoryAnalyticsStorage::new()))
        }
        StorageBackend::Mongodb => {
            let uri = config.mongodb_uri.as_deref().ok_or_else(|| {
                ConfigError::Invalid("MONGODB_URI is required for the mongodb storage backend".into())
            })?;
            let writer = MongoAnalyticsWriter::connect(uri, &config.database).await?;
            Ok(Arc::new(writer))
        }
    }
}

/// Assembles the webhook router from configuration and a writer.
pub fn build_router(
    config: &ServerConfig,
    writer: Arc<dyn AnalyticsWriter>,
) -> Result<Router, ConfigError> {
    config.validate()?;
    let secret = config
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::Invalid("WEBHOOK_SECRET is required".to_string()))?;

    let validator = Arc::new(HmacValidator::new(secret));
    let service = AnalyticsWebhookService::new(validator, writer);

    let mut state = WebhookState::new(Arc::new(service)).with_max_body_bytes(config.max_body_bytes);
    if config.rate_limit.enabled {
        let limiter = WebhookRateLimiter::with_limit(config.rate_limit.limit());
        state = state.with_rate_limiter(Arc::new(limiter));
    }

    tracing::info!(
        environment = %config.environment,
        storage = config.storage.backend.as_str(),
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_second = config.rate_limit.requests_per_second,
        burst = config.rate_limit.burst,
        "webhook handler initialized"
    );

    Ok(webhook_routes(&config.path, state))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}
