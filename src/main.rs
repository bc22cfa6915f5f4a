//! TCP line echo server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──────▶ listener ──▶ accept loop ──spawn──▶ Handler::handle (per connection)
//!                                    │                        │
//!     SIGHUP/INT/QUIT/TERM ──▶ Shutdown latch                 ▼
//!                                    │                  gate around each response
//!                                    ▼
//!          close listener → Handler::close (grace per connection) → wait for tasks
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use tcp_server::config::{load_or_default, ServerProperties};
use tcp_server::observability::{logging, LogSettings};
use tcp_server::{EchoHandler, Server, ServerConfig};

#[derive(Parser)]
#[command(name = "tcp-server")]
#[command(about = "Line echo TCP server with graceful shutdown", long_about = None)]
struct Cli {
    /// Configuration file; defaults apply when it does not exist.
    #[arg(short, long, default_value = "redis.conf")]
    config: PathBuf,

    /// Directory for log files.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Log file name prefix.
    #[arg(long, default_value = "tcp-server")]
    log_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let log_settings = LogSettings {
        path: cli.log_dir,
        name: cli.log_name,
        ..Default::default()
    };
    match logging::init(&log_settings) {
        Ok(path) => tracing::info!(path = %path.display(), "Logging to file"),
        Err(e) => tracing::warn!(error = ?e, "File logging disabled"),
    }

    tracing::info!("tcp-server v{} starting", env!("CARGO_PKG_VERSION"));

    let fallback = ServerProperties {
        bind: "0.0.0.0".to_string(),
        port: 6379,
        ..Default::default()
    };
    let properties = load_or_default(&cli.config, fallback)?;

    tracing::info!(
        bind = %properties.bind,
        port = properties.port,
        max_clients = properties.max_clients,
        append_only = properties.append_only,
        "Configuration loaded"
    );

    let server = Server::new(
        ServerConfig::new(properties.address()),
        Arc::new(EchoHandler::new()),
    );

    if let Err(e) = server.listen_and_serve_with_signal().await {
        tracing::error!(error = ?e, "Server failed");
        return Err(e.into());
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
