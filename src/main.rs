//! Localized documentation reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──GET /{lang}/docs/...──▶ http::server (request id, trace, limits)
//!                                          │
//!                                          ▼
//!                                   proxy::pipeline
//!                      ┌───────────────────┼────────────────────┐
//!                      ▼                   ▼                    ▼
//!                  routing            cache (moka)          upstream (reqwest)
//!              path → target URL     lookup / populate     GET ?hl={lang}
//!                                          ▲                    │
//!                                          │                    ▼
//!                                          └──── rewrite (HTML head/body, TOC)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use docs_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use docs_proxy::lifecycle::{wait_for_signal, Shutdown};
use docs_proxy::observability::{logging, metrics};
use docs_proxy::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "docs-proxy", version, about = "Localized documentation reverse proxy")]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "docs-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        cache_enabled = config.cache.enabled,
        rewrite_enabled = config.rewrite.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
