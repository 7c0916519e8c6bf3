//! Channel store implementation
//!
//! Owns one `ChannelEntry` per language key. Entries are created lazily on
//! first join and removed as soon as they have neither an interpreter nor
//! listeners.

use std::collections::BTreeMap;

use super::entry::{ChannelEntry, ChannelSummary};
use super::key::LanguageKey;

/// Store of all live language channels
///
/// Not synchronized on its own; the coordinator serializes all access.
#[derive(Debug, Default)]
pub struct ChannelStore {
    channels: BTreeMap<LanguageKey, ChannelEntry>,
}

impl ChannelStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an existing channel or create an empty one
    pub fn get_or_create(&mut self, language: &LanguageKey) -> &mut ChannelEntry {
        self.channels.entry(language.clone()).or_insert_with(|| {
            tracing::debug!(language = %language, "Channel created");
            ChannelEntry::new()
        })
    }

    /// Get a channel if it exists
    pub fn get(&self, language: &LanguageKey) -> Option<&ChannelEntry> {
        self.channels.get(language)
    }

    /// Get a mutable channel if it exists
    pub fn get_mut(&mut self, language: &LanguageKey) -> Option<&mut ChannelEntry> {
        self.channels.get_mut(language)
    }

    /// Remove the channel if it has no interpreter and no listeners
    ///
    /// Returns `true` if the channel was removed. Safe to call redundantly.
    pub fn remove_if_empty(&mut self, language: &LanguageKey) -> bool {
        let empty = self
            .channels
            .get(language)
            .map(ChannelEntry::is_empty)
            .unwrap_or(false);

        if empty {
            self.channels.remove(language);
            tracing::debug!(language = %language, "Channel removed");
        }
        empty
    }

    /// Snapshot of a channel (an empty summary if the channel does not exist)
    pub fn summary(&self, language: &LanguageKey) -> ChannelSummary {
        self.channels
            .get(language)
            .map(|entry| entry.summary(language))
            .unwrap_or_else(|| ChannelSummary::empty(language))
    }

    /// Snapshots of every channel, ordered by language key
    pub fn summaries(&self) -> Vec<ChannelSummary> {
        self.channels
            .iter()
            .map(|(language, entry)| entry.summary(language))
            .collect()
    }

    /// Check if a channel exists
    pub fn contains(&self, language: &LanguageKey) -> bool {
        self.channels.contains_key(language)
    }

    /// Number of live channels
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether there are no live channels
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
