//! Dead drop server.
//!
//! # Architecture Overview
//!
//! ```text
//!   POST /deaddrop                               GET /deaddrop/{id}[.ext]
//!        │                                                │
//!        ▼                                                ▼
//!  ┌───────────┐   ┌──────────────┐          ┌──────────────────────┐
//!  │ drop::id  │──▶│ wire         │          │ drop::id (strip .ext)│
//!  │ generate  │   │ serialize    │          └──────────┬───────────┘
//!  └───────────┘   └──────┬───────┘                     ▼
//!                         ▼                   ┌──────────────────┐
//!               ┌───────────────────┐         │ storage open     │
//!               │ storage create    │         └────────┬─────────┘
//!               │ (staging) publish │──── drop ───────▶│
//!               └───────────────────┘                  ▼
//!                                             ┌──────────────────┐
//!                                             │ wire parse       │
//!                                             │ drop::naming     │
//!                                             └────────┬─────────┘
//!                                                      ▼
//!                                           streamed body + headers
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use deaddrop::config::load_or_default;
use deaddrop::http::HttpServer;
use deaddrop::lifecycle::Shutdown;
use deaddrop::observability::{logging, metrics};
use deaddrop::storage::open_store;

#[derive(Parser)]
#[command(name = "deaddrop")]
#[command(about = "Store whole HTTP requests and replay their bodies as downloads", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long, env = "DEADDROP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    logging::init_logging(&config.observability)?;

    tracing::info!("deaddrop v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        storage_backend = ?config.storage.backend,
        storage_root = %config.storage.root.display(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = open_store(&config.storage).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, store);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
