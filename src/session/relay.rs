//! WebRTC signal relay
//!
//! Forwards offers, answers and ICE candidates between an interpreter and a
//! listener of the same channel. Anything else is dropped without telling the
//! sender: stale targets and mismatched roles are normal while peers join
//! and leave.

use crate::protocol::{RelayedSignal, ServerMessage, SignalKind, SignalRequest};
use crate::registry::{ConnId, ConnectionRegistry, Role};

use super::coordinator::Coordinator;
use super::notifier::Notifier;

/// Why a signal was not forwarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Sender holds no role
    SenderUnassigned,
    /// Type is not offer, answer or candidate
    UnsupportedType,
    /// Target is not a live connection
    UnknownTarget,
    /// Target holds no role
    TargetUnassigned,
    /// Sender and target are on different channels
    LanguageMismatch,
    /// Not an interpreter/listener pair
    InvalidRolePair,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            DropReason::SenderUnassigned => "sender unassigned",
            DropReason::UnsupportedType => "unsupported signal type",
            DropReason::UnknownTarget => "unknown target",
            DropReason::TargetUnassigned => "target unassigned",
            DropReason::LanguageMismatch => "language mismatch",
            DropReason::InvalidRolePair => "invalid role pair",
        };
        f.write_str(reason)
    }
}

impl<N: Notifier> Coordinator<N> {
    /// Forward a signal from `from` to `request.to`
    ///
    /// The SDP and candidate payloads are passed through untouched.
    pub async fn relay(&self, from: ConnId, request: SignalRequest) -> Result<(), DropReason> {
        let state = self.state.lock().await;

        match route(&state.connections, from, &request) {
            Ok(kind) => {
                tracing::trace!(from = %from, to = %request.to, kind = ?kind, "Signal relayed");
                self.stats.record_relayed();
                self.notifier.notify(
                    request.to,
                    ServerMessage::WebrtcSignal(RelayedSignal {
                        from,
                        kind,
                        sdp: request.sdp,
                        candidate: request.candidate,
                    }),
                );
                Ok(())
            }
            Err(reason) => {
                tracing::debug!(
                    from = %from,
                    to = %request.to,
                    kind = %request.kind,
                    reason = %reason,
                    "Signal dropped"
                );
                self.stats.record_dropped();
                Err(reason)
            }
        }
    }
}

fn route(
    connections: &ConnectionRegistry,
    from: ConnId,
    request: &SignalRequest,
) -> Result<SignalKind, DropReason> {
    let sender = connections.get(from).ok_or(DropReason::SenderUnassigned)?;
    let kind = SignalKind::parse(&request.kind).ok_or(DropReason::UnsupportedType)?;

    if !connections.contains(request.to) {
        return Err(DropReason::UnknownTarget);
    }
    let target = connections
        .get(request.to)
        .ok_or(DropReason::TargetUnassigned)?;

    if target.language != sender.language {
        return Err(DropReason::LanguageMismatch);
    }

    match (sender.role, target.role) {
        (Role::Interpreter, Role::Listener) | (Role::Listener, Role::Interpreter) => Ok(kind),
        _ => Err(DropReason::InvalidRolePair),
    }
}
