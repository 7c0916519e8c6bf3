//! Live-interpretation signaling server
//!
//! Run with: cargo run --example relay_server
//!
//! Environment:
//!   PORT=3000                     # listen on 0.0.0.0:PORT
//!   SIGNAL_BIND_ADDR=127.0.0.1:3000
//!   SIGNAL_MAX_CONNECTIONS=500    # 0 = unlimited
//!   RUST_LOG=interp_relay=debug
//!
//! Clients speak JSON over WebSocket, e.g. with websocat:
//!   websocat ws://localhost:3000
//!   {"event":"join_role","data":{"role":"listener","language":"fr"}}
//!
//! Every 30 seconds the server logs one line per active language channel.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use interp_relay::{ServerConfig, SignalingServer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let server = Arc::new(SignalingServer::new(config));

    println!("Signaling server on ws://{}", server.bind_addr());

    let reporter = {
        let coordinator = Arc::clone(server.coordinator());
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(30));
            loop {
                ticker.tick().await;
                let stats = coordinator.stats().await;
                tracing::info!(
                    connections = stats.active_connections,
                    channels = stats.active_channels,
                    relayed = stats.signals_relayed,
                    dropped = stats.signals_dropped,
                    evicted = stats.interpreters_evicted,
                    "Relay stats"
                );
                for channel in coordinator.channels().await {
                    tracing::info!(
                        language = %channel.language,
                        interpreter = channel.interpreter_connected,
                        streaming = channel.interpreter_streaming,
                        listeners = channel.listeners_count,
                        waiting = channel.waiting_listeners_count,
                        "Channel"
                    );
                }
            }
        })
    };

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    reporter.abort();
    Ok(())
}
