//! WebSocket signaling server
//!
//! Thin transport around the session coordinator: accepts connections,
//! assigns connection ids, decodes client messages into events and writes
//! queued server messages back out.

pub mod config;
mod connection;
pub mod listener;
pub mod outbox;

use std::sync::Arc;

use crate::session::Coordinator;

pub use config::ServerConfig;
pub use listener::SignalingServer;
pub use outbox::{Outbox, PeerQueue};

/// Coordinator wired to the server's outbound queues
pub type SharedCoordinator = Coordinator<Arc<Outbox>>;
