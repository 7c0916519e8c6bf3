//! Session coordinator
//!
//! The authoritative state machine for role assignment. Every operation
//! takes the single state lock, so joins, leaves, stream toggles and relays
//! are applied one at a time no matter how many connections race. Peer
//! notifications are queued through the `Notifier` while the lock is held,
//! which keeps each peer's view ordered; queuing never blocks.
//!
//! ```text
//!  Unassigned ──join──► Interpreter(lang) ──leave/disconnect/eviction──► Unassigned
//!      │                                                                  ▲
//!      └──────join──► Listener(lang) ───────leave/disconnect──────────────┘
//! ```

use tokio::sync::Mutex;

use crate::protocol::{ListenerNotice, OfferNeeded, ServerMessage, StatusLevel, StreamStateNotice, Welcome};
use crate::registry::{
    Assignment, ChannelStore, ChannelSummary, ConnId, ConnectionRegistry, JoinError, LanguageKey,
    Role,
};
use crate::stats::{RelayStats, RelayStatsSnapshot};

use super::event::Event;
use super::notifier::Notifier;

/// State guarded by the coordinator lock
#[derive(Debug, Default)]
pub(super) struct RelayState {
    pub(super) connections: ConnectionRegistry,
    pub(super) channels: ChannelStore,
}

/// Serialized owner of all connection and channel state
pub struct Coordinator<N: Notifier> {
    pub(super) state: Mutex<RelayState>,
    pub(super) notifier: N,
    pub(super) stats: RelayStats,
}

impl<N: Notifier> Coordinator<N> {
    /// Create a coordinator with empty state
    pub fn new(notifier: N) -> Self {
        Self {
            state: Mutex::new(RelayState::default()),
            notifier,
            stats: RelayStats::new(),
        }
    }

    /// Get the notifier
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Apply one event for a connection
    pub async fn handle(&self, conn: ConnId, event: Event) {
        match event {
            Event::Connect => self.connect(conn).await,
            Event::Join { role, language } => {
                // Failures were already reported to the connection
                let _ = self.join(conn, role.as_deref(), language.as_deref()).await;
            }
            Event::Leave => {
                self.leave(conn).await;
            }
            Event::StreamState { streaming } => {
                self.set_streaming(conn, streaming).await;
            }
            Event::Signal(request) => {
                let _ = self.relay(conn, request).await;
            }
            Event::Disconnect => self.disconnect(conn).await,
        }
    }

    /// Register a newly opened connection
    pub async fn connect(&self, conn: ConnId) {
        let mut state = self.state.lock().await;
        state.connections.connect(conn);
        self.stats.record_connection();

        tracing::debug!(conn_id = %conn, "Connection registered");

        self.notifier.notify(
            conn,
            ServerMessage::Welcome(Welcome {
                connection_id: conn,
            }),
        );
    }

    /// Assign a role on a language channel
    ///
    /// Any previous assignment of `conn` is torn down first. On error the
    /// connection receives an `error_notification` and no state changes.
    pub async fn join(
        &self,
        conn: ConnId,
        role: Option<&str>,
        language: Option<&str>,
    ) -> Result<Assignment, JoinError> {
        let mut state = self.state.lock().await;

        match self.join_locked(&mut state, conn, role, language) {
            Ok(assignment) => {
                self.stats.record_join();
                Ok(assignment)
            }
            Err(err) => {
                self.stats.record_join_rejected();
                tracing::debug!(conn_id = %conn, error = %err, "Join rejected");
                self.notifier
                    .notify(conn, ServerMessage::error(err.code(), err.to_string()));
                Err(err)
            }
        }
    }

    /// Drop a connection's assignment
    ///
    /// Returns `false` if the connection held no assignment.
    pub async fn leave(&self, conn: ConnId) -> bool {
        let mut state = self.state.lock().await;
        self.leave_locked(&mut state, conn)
    }

    /// Leave and forget a connection
    ///
    /// Idempotent: repeated or late disconnects are no-ops.
    pub async fn disconnect(&self, conn: ConnId) {
        let mut state = self.state.lock().await;
        self.leave_locked(&mut state, conn);

        if state.connections.remove(conn) {
            tracing::debug!(conn_id = %conn, "Connection removed");
        }
    }

    /// Record the interpreter's microphone state
    ///
    /// Ignored unless `conn` is the installed interpreter of its channel.
    /// Returns whether the change was applied.
    pub async fn set_streaming(&self, conn: ConnId, streaming: bool) -> bool {
        let mut state = self.state.lock().await;

        let language = match state.connections.get(conn) {
            Some(assignment) if assignment.role == Role::Interpreter => {
                assignment.language.clone()
            }
            _ => return false,
        };

        let listeners: Vec<ConnId> = match state.channels.get_mut(&language) {
            Some(channel) if channel.interpreter_id == Some(conn) => {
                channel.interpreter_streaming = streaming;
                channel.listeners.iter().copied().collect()
            }
            _ => return false,
        };

        tracing::info!(
            conn_id = %conn,
            language = %language,
            streaming = streaming,
            listeners = listeners.len(),
            "Interpreter stream state changed"
        );

        let notice = ServerMessage::InterpreterStreamState(StreamStateNotice {
            streaming,
            language: language.clone(),
        });
        self.fan_out(listeners.iter().copied(), &notice);

        if streaming {
            for listener in listeners {
                self.notifier.notify(
                    conn,
                    ServerMessage::WebrtcOfferNeeded(OfferNeeded {
                        listener_id: listener,
                    }),
                );
            }
        }

        self.broadcast_summary(&state, &language, None);
        true
    }

    /// Summary of one channel, if it exists
    pub async fn summary(&self, language: &str) -> Option<ChannelSummary> {
        let key = LanguageKey::normalize(language)?;
        let state = self.state.lock().await;
        state
            .channels
            .contains(&key)
            .then(|| state.channels.summary(&key))
    }

    /// Summaries of every live channel
    pub async fn channels(&self) -> Vec<ChannelSummary> {
        self.state.lock().await.channels.summaries()
    }

    /// Current assignment of a connection
    pub async fn assignment(&self, conn: ConnId) -> Option<Assignment> {
        self.state.lock().await.connections.get(conn).cloned()
    }

    /// Counters plus current connection and channel totals
    pub async fn stats(&self) -> RelayStatsSnapshot {
        let state = self.state.lock().await;
        self.stats
            .snapshot(state.connections.len(), state.channels.len())
    }

    fn join_locked(
        &self,
        state: &mut RelayState,
        conn: ConnId,
        role: Option<&str>,
        language: Option<&str>,
    ) -> Result<Assignment, JoinError> {
        let role = role.and_then(Role::parse).ok_or(JoinError::InvalidRole)?;
        let language = language
            .and_then(LanguageKey::normalize)
            .ok_or(JoinError::InvalidLanguage)?;
        if !state.connections.contains(conn) {
            return Err(JoinError::UnknownConnection);
        }

        self.leave_locked(state, conn);

        if role == Role::Interpreter {
            let previous = state
                .channels
                .get(&language)
                .and_then(|channel| channel.interpreter_id);
            if let Some(previous) = previous.filter(|id| *id != conn) {
                self.evict_locked(state, previous, &language);
            }
        }

        state.connections.assign(conn, role, language.clone());
        match role {
            Role::Interpreter => self.install_interpreter(state, conn, &language),
            Role::Listener => self.attach_listener(state, conn, &language),
        }
        self.broadcast_summary(state, &language, None);

        tracing::info!(conn_id = %conn, role = %role, language = %language, "Role joined");

        Ok(Assignment { role, language })
    }

    fn evict_locked(&self, state: &mut RelayState, previous: ConnId, language: &LanguageKey) {
        tracing::info!(conn_id = %previous, language = %language, "Evicting superseded interpreter");

        self.notifier.notify(
            previous,
            ServerMessage::status(
                StatusLevel::Warning,
                "Another interpreter took over this language. Your session has been stopped.",
            ),
        );
        self.leave_locked(state, previous);
        self.notifier.terminate(previous);
        self.stats.record_eviction();
    }

    fn install_interpreter(&self, state: &mut RelayState, conn: ConnId, language: &LanguageKey) {
        let channel = state.channels.get_or_create(language);
        channel.interpreter_id = Some(conn);
        channel.interpreter_streaming = false;

        if channel.listeners.is_empty() {
            self.notifier.notify(
                conn,
                ServerMessage::status(
                    StatusLevel::Info,
                    "No listeners yet. You will be notified when one connects.",
                ),
            );
        } else {
            self.notifier.notify(
                conn,
                ServerMessage::status(
                    StatusLevel::Success,
                    format!(
                        "{} listener(s) connected. Turn on your microphone.",
                        channel.listeners.len()
                    ),
                ),
            );
        }

        for listener in std::mem::take(&mut channel.waiting_listeners) {
            self.notifier.notify(
                listener,
                ServerMessage::status(
                    StatusLevel::Success,
                    "Interpreter connected. Audio will start shortly.",
                ),
            );
        }
    }

    fn attach_listener(&self, state: &mut RelayState, conn: ConnId, language: &LanguageKey) {
        let channel = state.channels.get_or_create(language);
        channel.listeners.insert(conn);

        let Some(interpreter) = channel.interpreter_id else {
            channel.waiting_listeners.insert(conn);
            self.notifier.notify(
                conn,
                ServerMessage::status(
                    StatusLevel::Warning,
                    "Interpreter not available yet. Please wait.",
                ),
            );
            return;
        };

        let status = if channel.interpreter_streaming {
            "Interpreter available. Connecting audio..."
        } else {
            "Interpreter available. Waiting for the microphone to start..."
        };
        self.notifier
            .notify(conn, ServerMessage::status(StatusLevel::Success, status));

        self.notifier.notify(
            interpreter,
            ServerMessage::ListenerConnected(ListenerNotice {
                listener_id: conn,
                language: language.clone(),
                listeners_count: channel.listeners.len(),
                message: "New listener connected.".into(),
            }),
        );

        if channel.interpreter_streaming {
            self.notifier.notify(
                interpreter,
                ServerMessage::WebrtcOfferNeeded(OfferNeeded { listener_id: conn }),
            );
        }
    }

    pub(super) fn leave_locked(&self, state: &mut RelayState, conn: ConnId) -> bool {
        let Some(Assignment { role, language }) = state.connections.clear(conn) else {
            return false;
        };

        if let Some(channel) = state.channels.get_mut(&language) {
            match role {
                Role::Interpreter if channel.interpreter_id == Some(conn) => {
                    channel.interpreter_id = None;
                    channel.interpreter_streaming = false;

                    let stopped = ServerMessage::InterpreterStreamState(StreamStateNotice {
                        streaming: false,
                        language: language.clone(),
                    });
                    self.fan_out(channel.listeners.iter().copied(), &stopped);

                    for &listener in &channel.listeners {
                        channel.waiting_listeners.insert(listener);
                        self.notifier.notify(
                            listener,
                            ServerMessage::status(
                                StatusLevel::Warning,
                                "Interpreter disconnected. Please wait...",
                            ),
                        );
                    }
                }
                // Superseded interpreter, nothing of the channel is ours
                Role::Interpreter => {}
                Role::Listener => {
                    channel.listeners.remove(&conn);
                    channel.waiting_listeners.remove(&conn);

                    if let Some(interpreter) = channel.interpreter_id {
                        self.notifier.notify(
                            interpreter,
                            ServerMessage::ListenerDisconnected(ListenerNotice {
                                listener_id: conn,
                                language: language.clone(),
                                listeners_count: channel.listeners.len(),
                                message: "A listener disconnected.".into(),
                            }),
                        );
                    }
                }
            }

            self.broadcast_summary(state, &language, Some(conn));
            state.channels.remove_if_empty(&language);
        }

        tracing::info!(conn_id = %conn, role = %role, language = %language, "Role left");
        true
    }

    #[cfg(test)]
    pub(crate) async fn assert_invariants(&self) {
        let state = self.state.lock().await;

        for summary in state.channels.summaries() {
            let language = summary.language.clone();
            let channel = state.channels.get(&language).unwrap();

            assert!(!channel.is_empty(), "empty channel {} kept", language);
            assert!(
                channel.waiting_listeners.is_subset(&channel.listeners),
                "waiting listeners not a subset in {}",
                language
            );
            if let Some(interpreter) = channel.interpreter_id {
                assert_eq!(
                    state.connections.get(interpreter),
                    Some(&Assignment {
                        role: Role::Interpreter,
                        language: language.clone()
                    })
                );
                assert!(channel.waiting_listeners.is_empty());
            }
            for &listener in &channel.listeners {
                assert_eq!(
                    state.connections.get(listener),
                    Some(&Assignment {
                        role: Role::Listener,
                        language: language.clone()
                    })
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::ErrorCode;
    use crate::session::notifier::recording::RecordingNotifier;

    type TestCoordinator = Coordinator<Arc<RecordingNotifier>>;

    fn setup() -> (TestCoordinator, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        (Coordinator::new(Arc::clone(&notifier)), notifier)
    }

    async fn connected(coordinator: &TestCoordinator, ids: &[u64]) {
        for &id in ids {
            coordinator.connect(ConnId(id)).await;
        }
    }

    fn statuses(messages: &[ServerMessage]) -> Vec<StatusLevel> {
        messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::StatusNotification(s) => Some(s.level),
                _ => None,
            })
            .collect()
    }

    fn last_summary(messages: &[ServerMessage]) -> Option<ChannelSummary> {
        messages.iter().rev().find_map(|m| match m {
            ServerMessage::LanguageStateUpdate(s) => Some(s.clone()),
            _ => None,
        })
    }

    #[tokio::test]
    async fn test_connect_sends_welcome() {
        let (coordinator, notifier) = setup();
        coordinator.connect(ConnId(5)).await;

        assert_eq!(
            notifier.take_for(ConnId(5)),
            vec![ServerMessage::Welcome(Welcome {
                connection_id: ConnId(5)
            })]
        );
        assert_eq!(coordinator.stats().await.active_connections, 1);
    }

    #[tokio::test]
    async fn test_interpreter_then_listener() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        notifier.clear();

        coordinator
            .join(ConnId(1), Some("interpreter"), Some("fr"))
            .await
            .unwrap();

        let to_a = notifier.take_for(ConnId(1));
        assert_eq!(statuses(&to_a), vec![StatusLevel::Info]);
        let summary = last_summary(&to_a).unwrap();
        assert!(summary.interpreter_connected);
        assert!(!summary.interpreter_streaming);
        assert_eq!(summary.listeners_count, 0);
        assert_eq!(summary.waiting_listeners_count, 0);

        coordinator
            .join(ConnId(2), Some("listener"), Some("fr"))
            .await
            .unwrap();

        let to_b = notifier.messages_for(ConnId(2));
        assert_eq!(statuses(&to_b), vec![StatusLevel::Success]);

        let to_a = notifier.take_for(ConnId(1));
        assert!(to_a.iter().any(|m| matches!(
            m,
            ServerMessage::ListenerConnected(n) if n.listener_id == ConnId(2) && n.listeners_count == 1
        )));
        // Not streaming yet, so no offer request
        assert!(!to_a
            .iter()
            .any(|m| matches!(m, ServerMessage::WebrtcOfferNeeded(_))));
        assert_eq!(last_summary(&to_a).unwrap().listeners_count, 1);

        coordinator.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_waiting_listener_released_by_interpreter() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[3, 4]).await;
        notifier.clear();

        coordinator
            .join(ConnId(3), Some("listener"), Some("de"))
            .await
            .unwrap();

        let to_c = notifier.take_for(ConnId(3));
        assert_eq!(statuses(&to_c), vec![StatusLevel::Warning]);
        assert_eq!(last_summary(&to_c).unwrap().waiting_listeners_count, 1);

        coordinator
            .join(ConnId(4), Some("interpreter"), Some("de"))
            .await
            .unwrap();

        let to_c = notifier.messages_for(ConnId(3));
        assert_eq!(statuses(&to_c), vec![StatusLevel::Success]);
        let summary = last_summary(&to_c).unwrap();
        assert_eq!(summary.waiting_listeners_count, 0);
        assert_eq!(summary.listeners_count, 1);
        assert!(summary.interpreter_connected);

        let to_d = notifier.messages_for(ConnId(4));
        assert_eq!(statuses(&to_d), vec![StatusLevel::Success]);

        coordinator.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_streaming_interpreter_disconnect_moves_listeners_to_waiting() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();
        assert!(coordinator.set_streaming(ConnId(1), true).await);
        notifier.clear();

        coordinator.disconnect(ConnId(1)).await;

        let to_b = notifier.take_for(ConnId(2));
        assert!(to_b.contains(&ServerMessage::InterpreterStreamState(StreamStateNotice {
            streaming: false,
            language: LanguageKey::normalize("fr").unwrap(),
        })));
        assert_eq!(statuses(&to_b), vec![StatusLevel::Warning]);

        let summary = coordinator.summary("fr").await.unwrap();
        assert!(!summary.interpreter_connected);
        assert!(!summary.interpreter_streaming);
        assert_eq!(summary.listeners_count, 1);
        assert_eq!(summary.waiting_listeners_count, 1);

        coordinator.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_second_interpreter_evicts_first() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2, 5]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();
        coordinator.set_streaming(ConnId(1), true).await;
        notifier.clear();

        coordinator
            .join(ConnId(5), Some("interpreter"), Some(" FR"))
            .await
            .unwrap();

        let to_a = notifier.messages_for(ConnId(1));
        assert_eq!(statuses(&to_a).first(), Some(&StatusLevel::Warning));
        assert_eq!(notifier.terminated(), vec![ConnId(1)]);
        assert!(coordinator.assignment(ConnId(1)).await.is_none());

        let summary = coordinator.summary("fr").await.unwrap();
        assert!(summary.interpreter_connected);
        assert!(!summary.interpreter_streaming);
        assert_eq!(summary.waiting_listeners_count, 0);
        assert_eq!(
            coordinator.assignment(ConnId(5)).await.unwrap().role,
            Role::Interpreter
        );

        // The evicted connection's late disconnect changes nothing
        notifier.clear();
        coordinator.disconnect(ConnId(1)).await;
        assert!(notifier.take().is_empty());
        assert!(coordinator.summary("fr").await.unwrap().interpreter_connected);
        assert_eq!(coordinator.stats().await.interpreters_evicted, 1);

        coordinator.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_rejoin_as_interpreter_does_not_evict_self() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();

        assert!(notifier.terminated().is_empty());
        assert!(coordinator.summary("fr").await.unwrap().interpreter_connected);
        coordinator.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_invalid_join_reports_error_without_mutation() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1]).await;
        coordinator.join(ConnId(1), Some("listener"), Some("fr")).await.unwrap();
        notifier.clear();

        let err = coordinator
            .join(ConnId(1), Some("admin"), Some("de"))
            .await
            .unwrap_err();
        assert_eq!(err, JoinError::InvalidRole);

        let err = coordinator
            .join(ConnId(1), Some("interpreter"), Some("   "))
            .await
            .unwrap_err();
        assert_eq!(err, JoinError::InvalidLanguage);

        let err = coordinator
            .join(ConnId(1), None, None)
            .await
            .unwrap_err();
        assert_eq!(err, JoinError::InvalidRole);

        let codes: Vec<ErrorCode> = notifier
            .take_for(ConnId(1))
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::ErrorNotification(e) => Some(e.code),
                _ => None,
            })
            .collect();
        assert_eq!(
            codes,
            vec![ErrorCode::InvalidRole, ErrorCode::InvalidLanguage, ErrorCode::InvalidRole]
        );

        // Previous assignment untouched
        assert_eq!(
            coordinator.assignment(ConnId(1)).await.unwrap().language.as_str(),
            "fr"
        );
        assert!(coordinator.summary("de").await.is_none());
        assert_eq!(coordinator.stats().await.joins_rejected, 3);
    }

    #[tokio::test]
    async fn test_join_from_unknown_connection_fails() {
        let (coordinator, notifier) = setup();

        let err = coordinator
            .join(ConnId(99), Some("interpreter"), Some("fr"))
            .await
            .unwrap_err();

        assert_eq!(err, JoinError::UnknownConnection);
        assert!(matches!(
            notifier.take_for(ConnId(99)).as_slice(),
            [ServerMessage::ErrorNotification(e)] if e.code == ErrorCode::JoinFailed
        ));
        assert!(coordinator.channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_language_normalization_shares_channel() {
        let (coordinator, _notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        coordinator.join(ConnId(1), Some("listener"), Some(" FR ")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();

        let channels = coordinator.channels().await;
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].listeners_count, 2);
        assert_eq!(coordinator.summary("Fr").await, Some(channels[0].clone()));
    }

    #[tokio::test]
    async fn test_join_then_leave_removes_channel() {
        let (coordinator, _notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("es")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("es")).await.unwrap();

        assert!(coordinator.leave(ConnId(2)).await);
        assert!(coordinator.summary("es").await.is_some());
        assert!(coordinator.leave(ConnId(1)).await);
        assert!(coordinator.summary("es").await.is_none());
        assert!(coordinator.channels().await.is_empty());
    }

    #[tokio::test]
    async fn test_double_leave_is_noop() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2, 3]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(3), Some("listener"), Some("fr")).await.unwrap();

        assert!(coordinator.leave(ConnId(2)).await);
        notifier.clear();

        assert!(!coordinator.leave(ConnId(2)).await);
        coordinator.disconnect(ConnId(2)).await;
        coordinator.disconnect(ConnId(2)).await;

        assert!(notifier.take().is_empty());
        assert_eq!(coordinator.summary("fr").await.unwrap().listeners_count, 1);
        assert_eq!(coordinator.stats().await.active_connections, 2);
    }

    #[tokio::test]
    async fn test_listener_leave_notifies_interpreter() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();
        notifier.clear();

        coordinator.leave(ConnId(2)).await;

        let to_a = notifier.messages_for(ConnId(1));
        assert!(to_a.iter().any(|m| matches!(
            m,
            ServerMessage::ListenerDisconnected(n) if n.listener_id == ConnId(2) && n.listeners_count == 0
        )));
        // The leaver still gets the final summary
        let to_b = notifier.messages_for(ConnId(2));
        assert_eq!(last_summary(&to_b).unwrap().listeners_count, 0);
    }

    #[tokio::test]
    async fn test_rejoin_moves_between_channels() {
        let (coordinator, _notifier) = setup();
        connected(&coordinator, &[1]).await;
        coordinator.join(ConnId(1), Some("listener"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(1), Some("listener"), Some("de")).await.unwrap();

        assert!(coordinator.summary("fr").await.is_none());
        assert_eq!(coordinator.summary("de").await.unwrap().listeners_count, 1);
        coordinator.assert_invariants().await;
    }

    #[tokio::test]
    async fn test_listener_joining_streaming_channel_triggers_offer() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.set_streaming(ConnId(1), true).await;
        notifier.clear();

        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();

        let to_a = notifier.messages_for(ConnId(1));
        assert!(to_a.contains(&ServerMessage::WebrtcOfferNeeded(OfferNeeded {
            listener_id: ConnId(2)
        })));
    }

    #[tokio::test]
    async fn test_set_streaming_requests_offers_for_every_listener() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2, 3]).await;
        coordinator.join(ConnId(1), Some("interpreter"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();
        coordinator.join(ConnId(3), Some("listener"), Some("fr")).await.unwrap();
        notifier.clear();

        assert!(coordinator.set_streaming(ConnId(1), true).await);

        let offers: Vec<ConnId> = notifier
            .messages_for(ConnId(1))
            .into_iter()
            .filter_map(|m| match m {
                ServerMessage::WebrtcOfferNeeded(o) => Some(o.listener_id),
                _ => None,
            })
            .collect();
        assert_eq!(offers, vec![ConnId(2), ConnId(3)]);

        // Raw state change goes to everyone but the sender
        assert!(!notifier
            .messages_for(ConnId(1))
            .iter()
            .any(|m| matches!(m, ServerMessage::InterpreterStreamState(_))));
        assert!(notifier
            .messages_for(ConnId(3))
            .iter()
            .any(|m| matches!(m, ServerMessage::InterpreterStreamState(n) if n.streaming)));
        assert!(coordinator.summary("fr").await.unwrap().interpreter_streaming);

        // Stopping does not request offers
        notifier.clear();
        assert!(coordinator.set_streaming(ConnId(1), false).await);
        assert!(!notifier
            .messages_for(ConnId(1))
            .iter()
            .any(|m| matches!(m, ServerMessage::WebrtcOfferNeeded(_))));
    }

    #[tokio::test]
    async fn test_set_streaming_ignored_for_non_interpreters() {
        let (coordinator, notifier) = setup();
        connected(&coordinator, &[1, 2]).await;
        coordinator.join(ConnId(2), Some("listener"), Some("fr")).await.unwrap();
        notifier.clear();

        assert!(!coordinator.set_streaming(ConnId(1), true).await);
        assert!(!coordinator.set_streaming(ConnId(2), true).await);
        assert!(!coordinator.set_streaming(ConnId(42), true).await);
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn test_handle_dispatches_events() {
        let (coordinator, _notifier) = setup();
        coordinator.handle(ConnId(1), Event::Connect).await;
        coordinator
            .handle(
                ConnId(1),
                Event::Join {
                    role: Some("interpreter".into()),
                    language: Some("it".into()),
                },
            )
            .await;
        coordinator
            .handle(ConnId(1), Event::StreamState { streaming: true })
            .await;

        assert!(coordinator.summary("it").await.unwrap().interpreter_streaming);

        coordinator.handle(ConnId(1), Event::Leave).await;
        coordinator.handle(ConnId(1), Event::Disconnect).await;

        assert!(coordinator.channels().await.is_empty());
        assert_eq!(coordinator.stats().await.active_connections, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_interpreter_joins_keep_single_interpreter() {
        let (coordinator, notifier) = setup();
        let coordinator = Arc::new(coordinator);
        let ids: Vec<u64> = (1..=16).collect();
        connected(&coordinator, &ids).await;

        let mut handles = Vec::new();
        for id in ids {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(async move {
                let role = if id % 4 == 0 { "interpreter" } else { "listener" };
                let role = if id <= 8 { "interpreter" } else { role };
                coordinator
                    .join(ConnId(id), Some(role), Some("FR"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        coordinator.assert_invariants().await;

        // 8 + 2 interpreter joins, all but the last one evicted
        let summary = coordinator.summary("fr").await.unwrap();
        assert!(summary.interpreter_connected);
        assert_eq!(notifier.terminated().len(), 9);
        assert_eq!(summary.listeners_count, 6);
    }
}
