//! Identifier types for connections and language channels
//!
//! This module defines the keys used to address connections and to group
//! them into per-language channels.

use serde::{Deserialize, Serialize};

/// Server-assigned identifier for a transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(pub u64);

impl std::fmt::Display for ConnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized language channel key
///
/// Always trimmed and lowercased, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct LanguageKey(String);

impl LanguageKey {
    /// Normalize a raw language string
    ///
    /// Returns `None` if nothing is left after trimming.
    pub fn normalize(raw: &str) -> Option<Self> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LanguageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role a connection can hold on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The single publisher of a channel
    Interpreter,
    /// A subscriber of a channel
    Listener,
}

impl Role {
    /// Parse a wire role name (exact, case-sensitive)
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "interpreter" => Some(Role::Interpreter),
            "listener" => Some(Role::Listener),
            _ => None,
        }
    }

    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Interpreter => "interpreter",
            Role::Listener => "listener",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
