//! Connection registry
//!
//! Maps live connection identifiers to their current role/language
//! assignment. A connection is present from `connect` until `remove`, and
//! holds at most one assignment at a time.

use std::collections::HashMap;

use super::key::{ConnId, LanguageKey, Role};

/// A connection's current role on a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Assigned role
    pub role: Role,
    /// Assigned channel
    pub language: LanguageKey,
}

/// Registry of live connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnId, Option<Assignment>>,
}

impl ConnectionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened connection (unassigned)
    pub fn connect(&mut self, id: ConnId) {
        self.connections.entry(id).or_insert(None);
    }

    /// Forget a connection entirely
    ///
    /// Returns `true` if the connection was known.
    pub fn remove(&mut self, id: ConnId) -> bool {
        self.connections.remove(&id).is_some()
    }

    /// Check whether a connection is live
    pub fn contains(&self, id: ConnId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Overwrite a connection's assignment
    ///
    /// Has no effect on unknown connections.
    pub fn assign(&mut self, id: ConnId, role: Role, language: LanguageKey) {
        if let Some(slot) = self.connections.get_mut(&id) {
            *slot = Some(Assignment { role, language });
        }
    }

    /// Clear a connection's assignment, returning the previous one
    pub fn clear(&mut self, id: ConnId) -> Option<Assignment> {
        self.connections.get_mut(&id).and_then(Option::take)
    }

    /// Current assignment of a connection
    pub fn get(&self, id: ConnId) -> Option<&Assignment> {
        self.connections.get(&id).and_then(Option::as_ref)
    }

    /// Number of live connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connections are live
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
