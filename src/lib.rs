//! Signaling relay for live interpretation
//!
//! One interpreter per language publishes a microphone stream to many
//! listeners over peer-to-peer WebRTC. This crate is the server side of that
//! setup: it tracks who interprets and who listens on each language channel,
//! and relays offers, answers and ICE candidates between exactly the right
//! pair of peers. Media never passes through it.
//!
//! # Example
//!
//! ```no_run
//! use interp_relay::{ServerConfig, SignalingServer};
//!
//! #[tokio::main]
//! async fn main() -> interp_relay::Result<()> {
//!     let server = SignalingServer::new(ServerConfig::from_env()?);
//!     server.run().await
//! }
//! ```

pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{ChannelSummary, ConnId, LanguageKey, Role};
pub use server::{Outbox, ServerConfig, SharedCoordinator, SignalingServer};
pub use session::{Coordinator, Event, Notifier};
pub use stats::RelayStatsSnapshot;
