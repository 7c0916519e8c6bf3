//! Peer notification seam
//!
//! The coordinator never talks to sockets directly. Everything it wants to
//! tell a peer goes through a `Notifier`, whose contract is fire-and-forget:
//! delivery may fail (slow peer, closed socket, unknown id) and that failure
//! is swallowed by the implementation, never reported back to the state
//! machine.

use std::sync::Arc;

use crate::protocol::ServerMessage;
use crate::registry::ConnId;

/// Best-effort delivery of server messages to connections
pub trait Notifier: Send + Sync + 'static {
    /// Queue a message for a connection, ignoring delivery failure
    ///
    /// Must not block.
    fn notify(&self, to: ConnId, message: ServerMessage);

    /// Ask the transport to close a connection after flushing queued messages
    ///
    /// Must not block. The transport later reports the close as a
    /// `Disconnect` event.
    fn terminate(&self, conn: ConnId);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, to: ConnId, message: ServerMessage) {
        (**self).notify(to, message)
    }

    fn terminate(&self, conn: ConnId) {
        (**self).terminate(conn)
    }
}

#[cfg(test)]
pub(crate) mod recording {
    //! In-memory notifier used by the coordinator tests

    use parking_lot::Mutex;

    use super::*;

    /// Something the coordinator asked the transport to do
    #[derive(Debug, Clone, PartialEq)]
    pub enum Delivery {
        Message(ConnId, ServerMessage),
        Terminate(ConnId),
    }

    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        log: Mutex<Vec<Delivery>>,
    }

    impl RecordingNotifier {
        /// Drain everything recorded so far
        pub fn take(&self) -> Vec<Delivery> {
            std::mem::take(&mut *self.log.lock())
        }

        /// Drain and keep only the messages addressed to `conn`
        pub fn take_for(&self, conn: ConnId) -> Vec<ServerMessage> {
            self.take()
                .into_iter()
                .filter_map(|d| match d {
                    Delivery::Message(to, msg) if to == conn => Some(msg),
                    _ => None,
                })
                .collect()
        }

        /// Messages addressed to `conn`, without draining
        pub fn messages_for(&self, conn: ConnId) -> Vec<ServerMessage> {
            self.log
                .lock()
                .iter()
                .filter_map(|d| match d {
                    Delivery::Message(to, msg) if *to == conn => Some(msg.clone()),
                    _ => None,
                })
                .collect()
        }

        /// Connections that were asked to terminate
        pub fn terminated(&self) -> Vec<ConnId> {
            self.log
                .lock()
                .iter()
                .filter_map(|d| match d {
                    Delivery::Terminate(conn) => Some(*conn),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.log.lock().clear();
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, to: ConnId, message: ServerMessage) {
            self.log.lock().push(Delivery::Message(to, message));
        }

        fn terminate(&self, conn: ConnId) {
            self.log.lock().push(Delivery::Terminate(conn));
        }
    }
}
