//! Statistics for the signaling relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Relay-wide counters
///
/// Updated lock-free from the coordinator; read with `snapshot()`.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    joins_accepted: AtomicU64,
    joins_rejected: AtomicU64,
    interpreters_evicted: AtomicU64,
    signals_relayed: AtomicU64,
    signals_dropped: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            joins_accepted: AtomicU64::new(0),
            joins_rejected: AtomicU64::new(0),
            interpreters_evicted: AtomicU64::new(0),
            signals_relayed: AtomicU64::new(0),
            signals_dropped: AtomicU64::new(0),
        }
    }

    pub(crate) fn record_connection(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join_rejected(&self) {
        self.joins_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.interpreters_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_relayed(&self) {
        self.signals_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    ///
    /// `active_connections` and `active_channels` come from the caller, which
    /// owns the registries.
    pub fn snapshot(&self, active_connections: usize, active_channels: usize) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            uptime: self.started_at.elapsed(),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            active_connections,
            active_channels,
            joins_accepted: self.joins_accepted.load(Ordering::Relaxed),
            joins_rejected: self.joins_rejected.load(Ordering::Relaxed),
            interpreters_evicted: self.interpreters_evicted.load(Ordering::Relaxed),
            signals_relayed: self.signals_relayed.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the relay counters at one instant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Time since the relay was created
    pub uptime: Duration,
    /// Connections ever registered
    pub connections_accepted: u64,
    /// Connections currently registered
    pub active_connections: usize,
    /// Channels currently stored
    pub active_channels: usize,
    /// Successful joins
    pub joins_accepted: u64,
    /// Joins rejected with an error notification
    pub joins_rejected: u64,
    /// Interpreters displaced by a newer one
    pub interpreters_evicted: u64,
    /// Signals forwarded to their target
    pub signals_relayed: u64,
    /// Signals silently dropped
    pub signals_dropped: u64,
}

impl RelayStatsSnapshot {
    /// Fraction of signals that were dropped (0.0 when nothing was sent)
    pub fn drop_ratio(&self) -> f64 {
        let total = self.signals_relayed + self.signals_dropped;
        if total > 0 {
            self.signals_dropped as f64 / total as f64
        } else {
            0.0
        }
    }
}
