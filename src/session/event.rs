//! Inbound events
//!
//! Every input the coordinator reacts to, in one tagged union. The transport
//! turns socket activity into `Event`s and feeds them, one at a time per
//! connection, to `Coordinator::handle`.

use serde_json::Value;

use crate::protocol::{ClientMessage, SignalRequest};

/// An input to the session state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Transport connection opened
    Connect,
    /// Role request; raw values are validated by the coordinator
    Join {
        /// Requested role, if it was a string
        role: Option<String>,
        /// Requested language, if it was a string
        language: Option<String>,
    },
    /// Explicit leave
    Leave,
    /// Interpreter microphone state
    StreamState {
        /// Whether the interpreter is streaming
        streaming: bool,
    },
    /// Offer, answer or candidate for another connection
    Signal(SignalRequest),
    /// Transport connection closed
    Disconnect,
}

impl From<ClientMessage> for Event {
    fn from(message: ClientMessage) -> Self {
        match message {
            ClientMessage::JoinRole(req) => Event::Join {
                role: string_value(req.role),
                language: string_value(req.language),
            },
            ClientMessage::LeaveRole => Event::Leave,
            ClientMessage::InterpreterStreamState(req) => Event::StreamState {
                streaming: req.streaming,
            },
            ClientMessage::WebrtcSignal(req) => Event::Signal(req),
        }
    }
}

fn string_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}
