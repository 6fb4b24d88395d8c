//! Standalone table-server binary.
//!
//! Usage: cargo run -p holdem-server -- --port 8080

use clap::Parser;
use holdem_server::{ServerConfig, WebServer};

/// Multiplayer no-limit hold'em table server
#[derive(Parser, Debug)]
#[command(name = "holdem-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Origin allowed to call the API cross-origin; omit to allow any
    #[arg(long)]
    client_origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    holdem_server::init_logging();
    let args = Args::parse();

    let config = ServerConfig {
        host: args.host,
        port: args.port,
        client_origin: args.client_origin,
        ..ServerConfig::default()
    };

    tracing::info!(host = %config.host, port = config.port, "starting table server");
    let handle = WebServer::new(config).start().await?;
    println!("server running at http://{}", handle.address());
    println!("press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.shutdown().await?;
    tracing::info!("server stopped cleanly");
    Ok(())
}
