//! Session coordination
//!
//! Role assignment, stream-state transitions, signal relay and channel
//! broadcasts, all driven through one `Coordinator`.
//!
//! # Architecture
//!
//! ```text
//!   [Connection task]  [Connection task]  [Connection task]
//!          │ Event            │ Event            │ Event
//!          └──────────────────┼──────────────────┘
//!                             ▼
//!                  Coordinator::handle()
//!              ┌──────────────────────────┐
//!              │ Mutex<RelayState> {      │
//!              │   connections,           │
//!              │   channels,              │
//!              │ }                        │
//!              └────────────┬─────────────┘
//!                           │ notify() / terminate()
//!                           ▼
//!                     impl Notifier ──► per-connection queues
//! ```

pub mod broadcast;
pub mod coordinator;
pub mod event;
pub mod notifier;
pub mod relay;

pub use coordinator::Coordinator;
pub use event::Event;
pub use notifier::Notifier;
pub use relay::DropReason;
