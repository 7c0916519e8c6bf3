//! Crate error types

use tokio_tungstenite::tungstenite;

/// Error type for server and transport operations
#[derive(Debug)]
pub enum Error {
    /// Socket I/O failure
    Io(std::io::Error),
    /// WebSocket protocol failure
    WebSocket(tungstenite::Error),
    /// Invalid configuration
    Config(String),
    /// WebSocket upgrade did not complete in time
    HandshakeTimeout,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::WebSocket(e) => write!(f, "WebSocket error: {}", e),
            Error::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            Error::HandshakeTimeout => write!(f, "WebSocket handshake timed out"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::WebSocket(e) => Some(e),
            Error::Config(_) | Error::HandshakeTimeout => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<tungstenite::Error> for Error {
    fn from(e: tungstenite::Error) -> Self {
        Error::WebSocket(e)
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
