//! Join error types
//!
//! Error types for role assignment. These are reported to the joining
//! connection and never mutate channel state.

use serde::Serialize;

/// Error type for join operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// Role is not `interpreter` or `listener`
    InvalidRole,
    /// Language is missing, not a string, or blank after trimming
    InvalidLanguage,
    /// The joining connection is not registered
    UnknownConnection,
}

impl JoinError {
    /// Wire error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            JoinError::InvalidRole => ErrorCode::InvalidRole,
            JoinError::InvalidLanguage => ErrorCode::InvalidLanguage,
            JoinError::UnknownConnection => ErrorCode::JoinFailed,
        }
    }
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinError::InvalidRole => write!(f, "Invalid role. Use interpreter or listener."),
            JoinError::InvalidLanguage => write!(f, "Invalid language."),
            JoinError::UnknownConnection => write!(f, "Failed to join role."),
        }
    }
}

impl std::error::Error for JoinError {}

/// Error codes carried by `error_notification`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Bad role
    InvalidRole,
    /// Bad language
    InvalidLanguage,
    /// Generic join failure
    JoinFailed,
}
