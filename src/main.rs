//! `api-mock`: serve declarative route groups over HTTP.

use std::path::PathBuf;
use std::sync::Arc;

use api_mock::config::{load_config, ConfigError};
use api_mock::http::server::{shutdown_signal, HttpServer};
use api_mock::observability::{logging, metrics};
use api_mock::{ApiMock, CallbackRegistry};
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Debug, Parser)]
#[command(name = "api-mock", version, about = "Mock REST backend driven by declarative route groups")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "api-mock.toml")]
    config: PathBuf,

    /// Override `server.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `mock.delay_ms`.
    #[arg(long)]
    delay_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.mock.delay_ms = delay_ms;
    }

    logging::init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "api-mock v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Config files can only use seed data; named callbacks need code
    let mock = Arc::new(ApiMock::from_config(&config, &CallbackRegistry::new()).map_err(ConfigError::Routes)?);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        groups = mock.group_count(),
        upstream = config.server.upstream.as_deref().unwrap_or("-"),
        "Listening for connections"
    );

    let server = HttpServer::new(mock, &config.server)?;
    server.run(listener, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
