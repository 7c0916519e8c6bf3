//! Per-connection task
//!
//! Upgrades the socket to WebSocket, turns inbound frames into coordinator
//! events, and runs a writer task that drains the connection's outbound
//! queue. Whatever ends the connection, the coordinator sees exactly one
//! `Disconnect`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::ConnId;
use crate::server::config::ServerConfig;
use crate::server::outbox::{Outbox, PeerQueue};
use crate::server::SharedCoordinator;
use crate::session::Event;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;
type WsStream = SplitStream<WebSocketStream<TcpStream>>;

/// One client connection
pub(crate) struct Connection {
    id: ConnId,
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: Arc<ServerConfig>,
    coordinator: Arc<SharedCoordinator>,
    outbox: Arc<Outbox>,
}

impl Connection {
    pub(crate) fn new(
        id: ConnId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: Arc<ServerConfig>,
        coordinator: Arc<SharedCoordinator>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            id,
            socket,
            peer_addr,
            config,
            coordinator,
            outbox,
        }
    }

    /// Run the connection until the peer leaves or is terminated
    pub(crate) async fn run(self) -> Result<()> {
        let Connection {
            id,
            socket,
            peer_addr,
            config,
            coordinator,
            outbox,
        } = self;

        let handshake =
            tokio_tungstenite::accept_async_with_config(socket, Some(config.websocket_config()));
        let ws = match timeout(config.handshake_timeout, handshake).await {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(Error::HandshakeTimeout),
        };

        tracing::debug!(conn_id = %id, peer = %peer_addr, "WebSocket established");

        let (sink, mut stream) = ws.split();
        let PeerQueue { rx, shutdown } = outbox.register(id);

        coordinator.handle(id, Event::Connect).await;

        let writer = tokio::spawn(write_loop(id, sink, rx, shutdown.clone(), config.clone()));
        let result = read_loop(id, &mut stream, &shutdown, &config, &coordinator).await;

        coordinator.handle(id, Event::Disconnect).await;
        outbox.unregister(id);
        shutdown.cancel();
        let _ = writer.await;

        result
    }
}

async fn read_loop(
    id: ConnId,
    stream: &mut WsStream,
    shutdown: &CancellationToken,
    config: &ServerConfig,
    coordinator: &SharedCoordinator,
) -> Result<()> {
    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!(conn_id = %id, "Connection terminated by server");
                return Ok(());
            }
            next = timeout(config.idle_timeout, stream.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                tracing::debug!(conn_id = %id, "Idle timeout");
                return Ok(());
            }
            Ok(None) => return Ok(()),
            Ok(Some(Err(WsError::Capacity(e)))) => {
                tracing::warn!(conn_id = %id, error = %e, "Oversized message, closing");
                return Ok(());
            }
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => match ClientMessage::from_json(&text) {
                Ok(message) => coordinator.handle(id, Event::from(message)).await,
                Err(e) => {
                    tracing::debug!(conn_id = %id, error = %e, "Unparseable message dropped");
                }
            },
            Message::Close(_) => return Ok(()),
            Message::Binary(data) => {
                tracing::debug!(conn_id = %id, size = data.len(), "Binary frame ignored");
            }
            // Pings are answered by tungstenite; pongs only reset the idle timer
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }
}

async fn write_loop(
    id: ConnId,
    mut sink: WsSink,
    mut rx: mpsc::Receiver<ServerMessage>,
    shutdown: CancellationToken,
    config: Arc<ServerConfig>,
) {
    // interval_at panics on a zero period
    let period = config.ping_interval.max(Duration::from_millis(100));
    let mut ping = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            message = rx.recv() => match message {
                Some(message) => {
                    if send(id, &mut sink, &message).await.is_err() {
                        return;
                    }
                }
                None => break,
            },
            _ = ping.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    return;
                }
            }
        }
    }

    // Flush whatever was queued before termination, e.g. an eviction notice
    while let Ok(message) = rx.try_recv() {
        if send(id, &mut sink, &message).await.is_err() {
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}

async fn send(id: ConnId, sink: &mut WsSink, message: &ServerMessage) -> Result<()> {
    let text = match message.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(conn_id = %id, event = message.event_name(), error = %e, "Failed to encode message");
            return Ok(());
        }
    };

    sink.send(Message::Text(text)).await.map_err(|e| {
        tracing::debug!(conn_id = %id, error = %e, "Write failed");
        Error::from(e)
    })
}
