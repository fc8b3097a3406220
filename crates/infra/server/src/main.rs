//! Analytics webhook server binary.

use analytics_server::{AnalyticsServer, Cli, LogFormat, ServerConfig};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    init_tracing(&config);

    let server = AnalyticsServer::from_config(config).await?;
    server.run().await?;

    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
