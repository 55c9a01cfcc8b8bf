//! Cache Statistics Module
//!
//! Tracks hits, misses, structural actions and the sequence counter, and
//! decides when the whole cache has to be reset.

use serde::Serialize;

/// Highest value any counter may reach before the cache resets itself.
pub const COUNTER_CEILING: u64 = u64::MAX - 1;

// == Cache Stats ==
/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key absent or expired)
    pub misses: u64,
    /// Number of structural modifications since the last reset
    pub actions: u64,
    /// Last sequence number handed out
    pub sequence: u64,
    /// Number of entries evicted for capacity
    pub evictions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits.saturating_add(self.misses);
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// == Stats Tracker ==
#[derive(Debug, Clone)]
pub struct StatsTracker {
    hits: u64,
    misses: u64,
    actions: u64,
    sequence: u64,
    evictions: u64,
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsTracker {
    /// Creates a tracker at the baseline: one action, sequence one.
    pub fn new() -> Self {
        Self {
            hits: 0,
            misses: 0,
            actions: 1,
            sequence: 1,
            evictions: 0,
        }
    }

    /// Restores counters read back from a snapshot.
    pub fn restore(hits: u64, misses: u64, actions: u64, sequence: u64) -> Self {
        Self {
            hits,
            misses,
            actions,
            sequence,
            evictions: 0,
        }
    }

    pub fn record_hit(&mut self) {
        self.hits = self.hits.saturating_add(1);
    }

    pub fn record_miss(&mut self) {
        self.misses = self.misses.saturating_add(1);
    }

    pub fn record_action(&mut self) {
        self.actions = self.actions.saturating_add(1);
    }

    pub fn record_eviction(&mut self) {
        self.evictions = self.evictions.saturating_add(1);
    }

    /// Advances and returns the sequence counter.
    pub fn next_sequence(&mut self) -> u64 {
        self.sequence = self.sequence.saturating_add(1);
        self.sequence
    }

    /// True once no fresh sequence number is left to hand out.
    pub fn sequence_exhausted(&self) -> bool {
        self.sequence >= COUNTER_CEILING
    }

    // == Reset Check ==
    /// True when the action threshold is reached or any counter is about to
    /// overflow.
    pub fn needs_reset(&self, reset_after: Option<u64>) -> bool {
        let threshold_hit = reset_after.is_some_and(|limit| self.actions >= limit);

        threshold_hit
            || self.actions >= COUNTER_CEILING
            || self.sequence_exhausted()
            || self.hits >= COUNTER_CEILING
            || self.misses >= COUNTER_CEILING
    }

    /// Returns every counter to the baseline.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Zeroes hits and misses only.
    pub fn reset_hit_miss(&mut self) {
        self.hits = 0;
        self.misses = 0;
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn actions(&self) -> u64 {
        self.actions
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn snapshot(&self, total_entries: usize) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            actions: self.actions,
            sequence: self.sequence,
            evictions: self.evictions,
            total_entries,
        }
    }
}
