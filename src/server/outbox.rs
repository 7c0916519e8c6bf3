//! Per-connection outbound queues
//!
//! `Outbox` is the server's `Notifier`: every live connection owns a bounded
//! queue drained by its writer task. `try_send` keeps notification
//! non-blocking; when a queue is full the message is dropped and logged.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use crate::protocol::ServerMessage;
use crate::registry::ConnId;
use crate::session::Notifier;

struct PeerHandle {
    tx: mpsc::Sender<ServerMessage>,
    shutdown: CancellationToken,
}

/// Receiving side of a connection's queue
pub struct PeerQueue {
    /// Messages to write to the socket
    pub rx: mpsc::Receiver<ServerMessage>,
    /// Cancelled when the coordinator terminates the connection
    pub shutdown: CancellationToken,
}

/// Registry of outbound queues, keyed by connection
pub struct Outbox {
    peers: RwLock<HashMap<ConnId, PeerHandle>>,
    capacity: usize,
}

impl Outbox {
    /// Create an outbox whose queues hold `capacity` messages
    pub fn new(capacity: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Create the queue for a new connection
    ///
    /// Replaces any queue previously registered under the same id.
    pub fn register(&self, conn: ConnId) -> PeerQueue {
        let (tx, rx) = mpsc::channel(self.capacity);
        let shutdown = CancellationToken::new();

        self.peers.write().insert(
            conn,
            PeerHandle {
                tx,
                shutdown: shutdown.clone(),
            },
        );

        PeerQueue { rx, shutdown }
    }

    /// Drop a connection's queue
    pub fn unregister(&self, conn: ConnId) {
        self.peers.write().remove(&conn);
    }

    /// Number of registered queues
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Whether no queues are registered
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl Notifier for Outbox {
    fn notify(&self, to: ConnId, message: ServerMessage) {
        let peers = self.peers.read();
        let Some(peer) = peers.get(&to) else {
            tracing::trace!(conn_id = %to, event = message.event_name(), "No queue for connection");
            return;
        };

        match peer.tx.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                tracing::warn!(
                    conn_id = %to,
                    event = message.event_name(),
                    "Outbound queue full, message dropped"
                );
            }
            Err(TrySendError::Closed(message)) => {
                tracing::debug!(
                    conn_id = %to,
                    event = message.event_name(),
                    "Outbound queue closed, message dropped"
                );
            }
        }
    }

    fn terminate(&self, conn: ConnId) {
        if let Some(peer) = self.peers.read().get(&conn) {
            tracing::debug!(conn_id = %conn, "Terminating connection");
            peer.shutdown.cancel();
        }
    }
}
