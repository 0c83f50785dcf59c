//! cgicc-hello: a single-connection TCP responder
//!
//! Accepts one client at a time, prints whatever the client sent, replies
//! with a fixed HTML page and closes the connection.
//!
//! Features:
//! - Strictly sequential accept/receive/respond/close loop
//! - Requests bounded to 1024 bytes, read in a single call
//! - Per-connection failures either stop the server or are discarded
//! - Configuration via CLI arguments or TOML file

mod config;
mod protocol;
mod runtime;
mod server;

use config::Config;
use server::Server;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for the request dump
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        on_error = ?config.on_error,
        read_timeout = ?config.read_timeout,
        "Starting cgicc-hello server"
    );

    let mut server = Server::bind(&config)?;
    server.serve_forever()?;

    Ok(())
}
