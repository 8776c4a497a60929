//! peercall-relay: WebSocket signaling relay for peercall clients.
//!
//! Clients register a name with `store_user`, then exchange call requests,
//! session descriptions and ICE candidates addressed by name. The relay
//! routes on the envelope type and target only; negotiation payloads are
//! forwarded untouched.

mod connection;
mod registry;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tracing_subscriber::EnvFilter;

use crate::connection::handle_connection;
use crate::registry::Registry;

#[derive(Parser)]
#[command(name = "peercall-relay", version, about = "Signaling relay for peercall clients")]
struct Args {
    /// Port to listen on (overrides `[server] port`).
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides `[server] bind`).
    #[arg(long)]
    bind: Option<String>,

    /// Config file path override.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let loaded = peercall_config::load_config(args.config.as_deref());
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.as_directive())
        .unwrap_or("info");
    let directive = args.log_level.as_deref().unwrap_or(level);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .init();

    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        peercall_config::PeercallConfig::default()
    });

    let registry = Registry::new();
    let register_timeout = Duration::from_secs(u64::from(config.server.register_timeout));
    let bind = args.bind.unwrap_or(config.server.bind);
    let port = args.port.unwrap_or(config.server.port);

    let addr = format!("{bind}:{port}");
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    tracing::info!("peercall-relay v{} listening on {}", env!("CARGO_PKG_VERSION"), addr);

    // Accept loop.
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let registry = registry.clone();
                tokio::spawn(async move {
                    match accept_async(stream).await {
                        Ok(ws) => handle_connection(ws, addr, registry.clone(), register_timeout).await,
                        Err(e) => {
                            tracing::warn!(peer = %addr, error = %e, "WS handshake failed");
                        }
                    }
                    if tracing::enabled!(tracing::Level::DEBUG) {
                        let online = registry.count().await;
                        tracing::debug!(online, "Connection finished");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "TCP accept error");
            }
        }
    }
}
