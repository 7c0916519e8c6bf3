//! Channel entry and summary types
//!
//! This module defines the per-language state stored in the channel store.

use std::collections::BTreeSet;

use serde::Serialize;

use super::key::{ConnId, LanguageKey};

/// State of a single language channel
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    /// Current interpreter (None if no interpreter is installed)
    pub interpreter_id: Option<ConnId>,

    /// Whether the interpreter's microphone is live
    ///
    /// Only meaningful while `interpreter_id` is set.
    pub interpreter_streaming: bool,

    /// All attached listeners
    pub listeners: BTreeSet<ConnId>,

    /// Listeners waiting for an interpreter (always a subset of `listeners`)
    pub waiting_listeners: BTreeSet<ConnId>,
}

impl ChannelEntry {
    /// Create an empty channel entry
    pub(super) fn new() -> Self {
        Self {
            interpreter_id: None,
            interpreter_streaming: false,
            listeners: BTreeSet::new(),
            waiting_listeners: BTreeSet::new(),
        }
    }

    /// Check if the channel has an interpreter
    pub fn has_interpreter(&self) -> bool {
        self.interpreter_id.is_some()
    }

    /// A channel with no interpreter and no listeners must not be stored
    pub fn is_empty(&self) -> bool {
        self.interpreter_id.is_none() && self.listeners.is_empty()
    }

    /// Every connection in the channel's broadcast group
    pub fn members(&self) -> Vec<ConnId> {
        self.interpreter_id
            .iter()
            .copied()
            .chain(self.listeners.iter().copied())
            .collect()
    }

    /// Read-only snapshot of this channel
    pub fn summary(&self, language: &LanguageKey) -> ChannelSummary {
        ChannelSummary {
            language: language.clone(),
            interpreter_connected: self.has_interpreter(),
            interpreter_streaming: self.has_interpreter() && self.interpreter_streaming,
            listeners_count: self.listeners.len(),
            waiting_listeners_count: self.waiting_listeners.len(),
        }
    }
}

/// Snapshot of a channel, broadcast to its members after every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    /// Channel key
    pub language: LanguageKey,
    /// Whether an interpreter is installed
    pub interpreter_connected: bool,
    /// Whether the interpreter is streaming
    pub interpreter_streaming: bool,
    /// Number of attached listeners
    pub listeners_count: usize,
    /// Number of listeners waiting for an interpreter
    pub waiting_listeners_count: usize,
}

impl ChannelSummary {
    /// Summary of a channel that does not exist
    pub fn empty(language: &LanguageKey) -> Self {
        Self {
            language: language.clone(),
            interpreter_connected: false,
            interpreter_streaming: false,
            listeners_count: 0,
            waiting_listeners_count: 0,
        }
    }
}
