//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// WebSocket upgrade must complete within this time
    pub handshake_timeout: Duration,

    /// Close the connection if no frame arrives for this long
    pub idle_timeout: Duration,

    /// Interval between keepalive pings
    pub ping_interval: Duration,

    /// Messages buffered per connection before new ones are dropped
    pub outbound_queue_capacity: usize,

    /// Largest accepted inbound text frame in bytes
    pub max_message_size: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            max_connections: 0, // Unlimited
            handshake_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
            ping_interval: Duration::from_secs(20),
            outbound_queue_capacity: 256,
            max_message_size: 64 * 1024, // SDP bodies are a few KB
            tcp_nodelay: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Build a config from process environment variables
    ///
    /// - `SIGNAL_BIND_ADDR`: full socket address, e.g. `0.0.0.0:3000`
    /// - `PORT`: port only (ignored when `SIGNAL_BIND_ADDR` is set)
    /// - `SIGNAL_MAX_CONNECTIONS`: connection limit, 0 for unlimited
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("SIGNAL_BIND_ADDR") {
            config.bind_addr = addr
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("SIGNAL_BIND_ADDR is not a socket address: {}", addr)))?;
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {}", port)))?;
            config.bind_addr.set_port(port);
        }

        if let Some(max) = lookup("SIGNAL_MAX_CONNECTIONS") {
            config.max_connections = max.trim().parse().map_err(|_| {
                Error::Config(format!("SIGNAL_MAX_CONNECTIONS is not a number: {}", max))
            })?;
        }

        Ok(config)
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set idle timeout
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set keepalive ping interval
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set per-connection outbound queue capacity (at least 1)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set maximum inbound message size
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// WebSocket reader limits, enforced while frames are read
    pub fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig {
            max_message_size: Some(self.max_message_size),
            max_frame_size: Some(self.max_message_size),
            ..WebSocketConfig::default()
        }
    }
}
