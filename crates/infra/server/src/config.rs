//! Server configuration.

use analytics_axum::DEFAULT_MAX_BODY_BYTES;
use analytics_webhooks::RateLimit;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Route the webhook is served on.
    pub path: String,
    /// Deployment environment label, logged at startup.
    pub environment: String,
    /// Log level.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
    /// Shared HMAC secret. Required.
    pub webhook_secret: Option<String>,
    /// Storage backend configuration.
    pub storage: StorageConfig,
    /// Admission control configuration.
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            path: "/webhook".to_string(),
            environment: "production".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            webhook_secret: None,
            storage: StorageConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Checks that the configuration can start a server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook_secret.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid("WEBHOOK_SECRET is required".to_string()));
        }

        validate_path(&self.path)?;

        if self.storage.backend == StorageBackend::Mongodb
            && self.storage.mongodb_uri.as_deref().is_none_or(str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "MONGODB_URI is required for the mongodb storage backend".to_string(),
            ));
        }

        if self.rate_limit.enabled
            && (self.rate_limit.burst == 0 || self.rate_limit.requests_per_second == 0)
        {
            return Err(ConfigError::Invalid(
                "rate_limit.burst and rate_limit.requests_per_second must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address string to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The webhook route is a literal path; capture syntax would make the router
/// panic when the route is registered.
fn validate_path(path: &str) -> Result<(), ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Invalid(format!("path must start with '/': {}", path)));
    }

    let has_capture = path.contains(['{', '}'])
        || path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'));
    if has_capture {
        return Err(ConfigError::Invalid(format!(
            "path must not contain route parameters: {}",
            path
        )));
    }

    Ok(())
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map. Data is lost on exit.
    #[default]
    Memory,
    /// MongoDB collection.
    Mongodb,
}

impl StorageBackend {
    /// Name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Mongodb => "mongodb",
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend to use.
    pub backend: StorageBackend,
    /// MongoDB connection string.
    pub mongodb_uri: Option<String>,
    /// MongoDB database name.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            mongodb_uri: None,
            database: "analytics".to_string(),
        }
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether admission control is applied.
    pub enabled: bool,
    /// Tokens refilled per second.
    pub requests_per_second: u32,
    /// Bucket capacity.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        let limit = RateLimit::default();
        Self {
            enabled: true,
            requests_per_second: limit.requests_per_second,
            burst: limit.burst,
        }
    }
}

impl RateLimitConfig {
    /// Limit handed to the token bucket.
    pub fn limit(&self) -> RateLimit {
        RateLimit {
            requests_per_second: self.requests_per_second,
            burst: self.burst,
        }
    }
}

/// Loads configuration from a TOML file.
pub fn load_config(path: impl AsRef<Path>) -> Result<ServerConfig, ConfigError> {
    let content =
        std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError(e.to_string()))?;
    parse_config(&content)
}

/// Parses configuration from TOML text. Missing keys keep their defaults.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Command-line and environment overrides.
#[derive(Debug, Parser)]
#[command(name = "analytics-webhook-server", about = "Receives signed analytics webhooks")]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "CONFIG_PATH")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "HOST")]
    pub host: Option<String>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Shared HMAC secret.
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    #[arg(long, env = "ENVIRONMENT")]
    pub environment: Option<String>,

    #[arg(long, env = "STORAGE_BACKEND", value_enum)]
    pub storage: Option<StorageBackend>,

    #[arg(long, env = "MONGODB_URI", hide_env_values = true)]
    pub mongodb_uri: Option<String>,

    #[arg(long, env = "MONGODB_DATABASE")]
    pub database: Option<String>,

    /// Turn off admission control.
    #[arg(long)]
    pub disable_rate_limit: bool,
}

impl Cli {
    /// Resolves the final configuration: file (or defaults), then overrides.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secret) = self.webhook_secret {
            config.webhook_secret = Some(secret);
        }
        if let Some(environment) = self.environment {
            config.environment = environment;
        }
        if let Some(backend) = self.storage {
            config.storage.backend = backend;
        }
        if let Some(uri) = self.mongodb_uri {
            config.storage.mongodb_uri = Some(uri);
        }
        if let Some(database) = self.database {
            config.storage.database = database;
        }
        if self.disable_rate_limit {
            config.rate_limit.enabled = false;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
