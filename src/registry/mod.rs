//! Connection and channel registries
//!
//! The registry tracks which connections are live, which role each one holds,
//! and the per-language channel state they are grouped into.
//!
//! # Architecture
//!
//! ```text
//!        ConnectionRegistry                    ChannelStore
//!  ┌──────────────────────────┐   ┌───────────────────────────────────┐
//!  │ ConnId -> Option<        │   │ LanguageKey -> ChannelEntry {     │
//!  │   Assignment {           │   │   interpreter_id,                 │
//!  │     role, language ──────┼──►│   interpreter_streaming,          │
//!  │   }>                     │   │   listeners,                      │
//!  └──────────────────────────┘   │   waiting_listeners ⊆ listeners,  │
//!                                 │ }                                 │
//!                                 └───────────────────────────────────┘
//! ```
//!
//! Neither type is synchronized; both are owned by the session coordinator,
//! which serializes every mutation.

pub mod connections;
pub mod entry;
pub mod error;
pub mod key;
pub mod store;

pub use connections::{Assignment, ConnectionRegistry};
pub use entry::{ChannelEntry, ChannelSummary};
pub use error::{ErrorCode, JoinError};
pub use key::{ConnId, LanguageKey, Role};
pub use store::ChannelStore;
