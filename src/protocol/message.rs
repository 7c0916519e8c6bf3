//! Signaling wire messages
//!
//! Every WebSocket text frame carries one JSON object of the form
//! `{"event": "<name>", "data": {...}}`. Field names inside `data` are
//! camelCase. SDP bodies and ICE candidates are opaque `serde_json::Value`s
//! that are forwarded without inspection.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{ChannelSummary, ConnId, ErrorCode, LanguageKey};

/// Messages sent by clients
///
/// A missing or `null` `data` decodes to the payload's default, so a bare
/// `{"event":"join_role"}` still reaches validation and is answered with
/// `INVALID_ROLE`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Request a role on a language channel
    JoinRole(JoinRequest),
    /// Drop the current role
    LeaveRole,
    /// Interpreter microphone toggled
    InterpreterStreamState(StreamStateRequest),
    /// Offer, answer or ICE candidate for a peer
    WebrtcSignal(SignalRequest),
}

const CLIENT_EVENTS: &[&str] = &[
    "join_role",
    "leave_role",
    "interpreter_stream_state",
    "webrtc_signal",
];

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    data: Value,
}

impl ClientMessage {
    /// Parse a text frame
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let Envelope { event, data } = serde_json::from_str(text)?;

        match event.as_str() {
            "join_role" => payload_or_default(data).map(ClientMessage::JoinRole),
            "leave_role" => Ok(ClientMessage::LeaveRole),
            "interpreter_stream_state" => {
                payload_or_default(data).map(ClientMessage::InterpreterStreamState)
            }
            "webrtc_signal" => serde_json::from_value(data).map(ClientMessage::WebrtcSignal),
            other => Err(de::Error::unknown_variant(other, CLIENT_EVENTS)),
        }
    }
}

fn payload_or_default<T: DeserializeOwned + Default>(data: Value) -> serde_json::Result<T> {
    if data.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(data)
    }
}

/// Payload of `join_role`
///
/// Both fields are kept as raw JSON so that type errors surface as
/// `INVALID_ROLE` / `INVALID_LANGUAGE` rather than as parse failures.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JoinRequest {
    /// Requested role
    #[serde(default)]
    pub role: Value,
    /// Requested language (normalized by the coordinator)
    #[serde(default)]
    pub language: Value,
}

/// Payload of `interpreter_stream_state`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StreamStateRequest {
    /// Whether the microphone is live
    #[serde(default)]
    pub streaming: bool,
}

/// Payload of an inbound `webrtc_signal`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SignalRequest {
    /// Target connection
    pub to: ConnId,
    /// Signal type (`offer`, `answer` or `candidate`)
    #[serde(rename = "type")]
    pub kind: String,
    /// Session description, if any
    #[serde(default)]
    pub sdp: Option<Value>,
    /// ICE candidate, if any
    #[serde(default)]
    pub candidate: Option<Value>,
}

/// Severity of a status notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    /// Informational
    Info,
    /// Something became available
    Success,
    /// Degraded or waiting state
    Warning,
}

/// Messages sent by the server
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Identifier assigned to the connection
    Welcome(Welcome),
    /// Human readable status
    StatusNotification(StatusNotification),
    /// Rejected request
    ErrorNotification(ErrorNotification),
    /// Channel snapshot after a mutation
    LanguageStateUpdate(ChannelSummary),
    /// A listener attached (interpreter only)
    ListenerConnected(ListenerNotice),
    /// A listener detached (interpreter only)
    ListenerDisconnected(ListenerNotice),
    /// Interpreter started or stopped streaming
    InterpreterStreamState(StreamStateNotice),
    /// Interpreter must open a peer connection to a listener
    WebrtcOfferNeeded(OfferNeeded),
    /// Relayed offer, answer or candidate
    WebrtcSignal(RelayedSignal),
}

impl ServerMessage {
    /// Build a status notification
    pub fn status(level: StatusLevel, message: impl Into<String>) -> Self {
        ServerMessage::StatusNotification(StatusNotification {
            level,
            message: message.into(),
        })
    }

    /// Build an error notification
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerMessage::ErrorNotification(ErrorNotification {
            code,
            message: message.into(),
        })
    }

    /// Wire event name, for logging
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::Welcome(_) => "welcome",
            ServerMessage::StatusNotification(_) => "status_notification",
            ServerMessage::ErrorNotification(_) => "error_notification",
            ServerMessage::LanguageStateUpdate(_) => "language_state_update",
            ServerMessage::ListenerConnected(_) => "listener_connected",
            ServerMessage::ListenerDisconnected(_) => "listener_disconnected",
            ServerMessage::InterpreterStreamState(_) => "interpreter_stream_state",
            ServerMessage::WebrtcOfferNeeded(_) => "webrtc_offer_needed",
            ServerMessage::WebrtcSignal(_) => "webrtc_signal",
        }
    }

    /// Encode as a text frame
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Payload of `welcome`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    /// The connection's own identifier
    pub connection_id: ConnId,
}

/// Payload of `status_notification`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusNotification {
    /// Severity
    pub level: StatusLevel,
    /// Text shown to the user
    pub message: String,
}

/// Payload of `error_notification`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotification {
    /// Machine readable code
    pub code: ErrorCode,
    /// Text shown to the user
    pub message: String,
}

/// Payload of `listener_connected` / `listener_disconnected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerNotice {
    /// The listener that attached or detached
    pub listener_id: ConnId,
    /// Channel key
    pub language: LanguageKey,
    /// Listener count after the change
    pub listeners_count: usize,
    /// Text shown to the interpreter
    pub message: String,
}

/// Payload of `interpreter_stream_state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStateNotice {
    /// Whether the interpreter is streaming
    pub streaming: bool,
    /// Channel key
    pub language: LanguageKey,
}

/// Payload of `webrtc_offer_needed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferNeeded {
    /// Listener that needs a fresh peer connection
    pub listener_id: ConnId,
}

/// Payload of an outbound `webrtc_signal`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayedSignal {
    /// Sending connection
    pub from: ConnId,
    /// Signal type
    #[serde(rename = "type")]
    pub kind: SignalKind,
    /// Session description, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdp: Option<Value>,
    /// ICE candidate, verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<Value>,
}

/// Relayable signal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// SDP offer
    Offer,
    /// SDP answer
    Answer,
    /// ICE candidate
    Candidate,
}

impl SignalKind {
    /// Parse a wire signal type
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "offer" => Some(SignalKind::Offer),
            "answer" => Some(SignalKind::Answer),
            "candidate" => Some(SignalKind::Candidate),
            _ => None,
        }
    }
}
