//! Signaling server listener
//!
//! Handles the TCP accept loop and spawns one task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::Result;
use crate::registry::ConnId;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::outbox::Outbox;
use crate::server::SharedCoordinator;
use crate::session::Coordinator;

/// WebSocket signaling server
pub struct SignalingServer {
    config: Arc<ServerConfig>,
    coordinator: Arc<SharedCoordinator>,
    outbox: Arc<Outbox>,
    next_conn_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl SignalingServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let outbox = Arc::new(Outbox::new(config.outbound_queue_capacity));
        let coordinator = Arc::new(Coordinator::new(Arc::clone(&outbox)));

        Self {
            config: Arc::new(config),
            coordinator,
            outbox,
            next_conn_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the session coordinator
    pub fn coordinator(&self) -> &Arc<SharedCoordinator> {
        &self.coordinator
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails to bind.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %listener.local_addr()?, "Signaling server listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            _ = self.accept_loop(&listener) => {}
        }

        Ok(())
    }

    async fn accept_loop(&self, listener: &TcpListener) {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let conn_id = ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(conn_id = %conn_id, peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let connection = Connection::new(
            conn_id,
            socket,
            peer_addr,
            Arc::clone(&self.config),
            Arc::clone(&self.coordinator),
            Arc::clone(&self.outbox),
        );

        tokio::spawn(async move {
            let _permit = permit;

            if let Err(e) = connection.run().await {
                tracing::debug!(conn_id = %conn_id, error = %e, "Connection error");
            }

            tracing::debug!(conn_id = %conn_id, "Connection closed");
        });
    }
}
