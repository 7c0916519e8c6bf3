//! Channel-wide fan-out
//!
//! A channel's broadcast group is its interpreter plus its listeners. The
//! summary is rebuilt from the store on every call, so members always see
//! the state after the mutation that triggered it.

use crate::protocol::ServerMessage;
use crate::registry::{ChannelEntry, ConnId, LanguageKey};

use super::coordinator::{Coordinator, RelayState};
use super::notifier::Notifier;

impl<N: Notifier> Coordinator<N> {
    /// Queue the same message for several connections
    pub(super) fn fan_out(
        &self,
        recipients: impl IntoIterator<Item = ConnId>,
        message: &ServerMessage,
    ) {
        for conn in recipients {
            self.notifier.notify(conn, message.clone());
        }
    }

    /// Send `language_state_update` to every member of a channel
    ///
    /// `leaving` is a connection that just left the group but still gets
    /// this final update.
    pub(super) fn broadcast_summary(
        &self,
        state: &RelayState,
        language: &LanguageKey,
        leaving: Option<ConnId>,
    ) {
        let summary = state.channels.summary(language);
        let mut members = state
            .channels
            .get(language)
            .map(ChannelEntry::members)
            .unwrap_or_default();

        if let Some(conn) = leaving {
            if !members.contains(&conn) {
                members.push(conn);
            }
        }

        tracing::trace!(
            language = %language,
            recipients = members.len(),
            listeners = summary.listeners_count,
            waiting = summary.waiting_listeners_count,
            "Broadcasting channel summary"
        );

        self.fan_out(members, &ServerMessage::LanguageStateUpdate(summary));
    }
}
