//! Signaling protocol
//!
//! JSON message types exchanged with browser clients over WebSocket.

pub mod message;

pub use message::{
    ClientMessage, ErrorNotification, JoinRequest, ListenerNotice, OfferNeeded, RelayedSignal,
    ServerMessage, SignalKind, SignalRequest, StatusLevel, StatusNotification, StreamStateNotice,
    StreamStateRequest, Welcome,
};
