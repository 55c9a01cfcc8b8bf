//! Cache Store Module
//!
//! Main cache engine: a capacity index with promote-on-hit ordering, TTL
//! expiry, optional compression, a lazily started reaper and snapshot
//! persistence, all behind one cache-wide lock.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::cache::index::{CapacityIndex, EvictedSlot};
use crate::cache::stats::StatsTracker;
use crate::cache::{CacheEntry, CacheStats, Cacheable, Clock, Lifetime, SystemClock};
use crate::config::CacheSettings;
use crate::error::{CacheError, Result};
use crate::persistence::{Snapshot, SnapshotSettings};
use crate::tasks::{Reaper, ReaperState, Sweep};

// == Object Cache ==
/// Thread-safe object cache handle.
///
/// Cloning is cheap and every clone refers to the same cache. All operations
/// take the same lock for their whole duration; there is no read/write split
/// because a successful `get` reorders the index too.
pub struct ObjectCache<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for ObjectCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Shared<T> {
    state: Mutex<CacheState<T>>,
    clock: Arc<dyn Clock>,
}

impl<T: Cacheable> Sweep for Shared<T> {
    fn sweep(&self) -> usize {
        let now = self.clock.now();
        self.state.lock().purge_expired(now)
    }
}

// == Cache State ==
/// Everything guarded by the cache lock.
struct CacheState<T> {
    index: CapacityIndex<T>,
    stats: StatsTracker,
    settings: CacheSettings,
    reaper: Reaper,
    destroyed: bool,
}

impl<T: Cacheable> CacheState<T> {
    fn is_live(&self) -> bool {
        self.settings.enabled && !self.destroyed
    }

    // == Admit ==
    /// Stores a new entry at the newest end of the ordering.
    fn admit(
        &mut self,
        key: String,
        value: T,
        lifetime: Lifetime,
        compressed: bool,
        double_buffer: bool,
        now: DateTime<Utc>,
    ) {
        let mut seq = self.stats.next_sequence();
        self.stats.record_action();

        if self.stats.needs_reset(self.settings.reset_after) {
            info!(
                actions = self.stats.actions(),
                sequence = seq,
                "Cache hit its reset threshold, flushing"
            );
            self.flush();
            seq = self.stats.sequence();
        } else {
            self.index.remove(&key);
            self.enforce_capacity();
        }

        let entry = CacheEntry::new(value, now, lifetime, compressed, double_buffer);
        self.index.insert(key, seq, entry);
    }

    /// Evicts from the oldest end until there is room for one more entry.
    fn enforce_capacity(&mut self) {
        let limit = self.settings.cache_size.max(1);

        while self.index.len() >= limit {
            match self.index.evict_oldest() {
                Some(EvictedSlot::Key(key)) => {
                    self.stats.record_eviction();
                    debug!(key = %key, "Evicted oldest entry");
                }
                Some(EvictedSlot::Stale) => continue,
                None => break,
            }
        }
    }

    // == Lookup ==
    fn lookup(&mut self, key: &str, now: DateTime<Utc>) -> Option<T> {
        let expired = match self.index.get(key) {
            Some(entry) => entry.is_expired(now),
            None => {
                self.record_miss(key);
                return None;
            }
        };

        if expired {
            self.index.remove(key);
            self.record_miss(key);
            return None;
        }

        let decoded = self.index.get_mut(key)?.value();
        let value = match decoded {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %key, error = %err, "Dropping undecodable entry");
                self.index.remove(key);
                self.record_miss(key);
                return None;
            }
        };

        // Past the ceiling the entry keeps its slot until the next set flushes.
        let seq = if self.stats.sequence_exhausted() {
            self.stats.sequence()
        } else {
            let seq = self.stats.next_sequence();
            self.index.promote(key, seq);
            seq
        };
        self.record_hit(key, seq);
        Some(value)
    }

    fn record_hit(&mut self, key: &str, seq: u64) {
        self.stats.record_hit();
        if self.settings.debug {
            debug!(key = %key, sequence = seq, "Cache hit");
        }
    }

    fn record_miss(&mut self, key: &str) {
        self.stats.record_miss();
        if self.settings.debug {
            debug!(key = %key, "Cache miss");
        }
    }

    fn remove_entry(&mut self, key: &str) {
        self.stats.record_action();
        if self.index.remove(key).is_some() {
            debug!(key = %key, "Removed entry");
        }
    }

    fn flush(&mut self) {
        self.index.clear();
        self.stats.reset();
        debug!("Cache flushed");
    }

    fn purge_expired(&mut self, now: DateTime<Utc>) -> usize {
        self.index.prune(|entry| entry.is_expired(now))
    }

    // == Snapshot ==
    /// Collects live entries and scalar state, dropping expired entries on
    /// the way.
    fn snapshot(&mut self, now: DateTime<Utc>) -> Result<Snapshot<T>> {
        self.purge_expired(now);

        let mut entries = BTreeMap::new();
        for (key, entry) in self.index.iter() {
            entries.insert(key.clone(), entry.snapshot_value()?);
        }

        let settings = SnapshotSettings {
            cache_size: self.settings.cache_size as u64,
            sequence: self.stats.sequence(),
            actions: self.stats.actions(),
            reset_after: self.settings.reset_after,
            misses: self.stats.misses(),
            hits: self.stats.hits(),
            debug: self.settings.debug,
            lifetime: self.settings.lifetime,
            update_interval_secs: self.settings.update_interval_secs,
            compressed: self.settings.compressed,
            double_buffer: self.settings.double_buffer,
        };

        Ok(Snapshot { entries, settings })
    }

    // == Restore ==
    /// Applies the scalar state of `snapshot`, then re-admits every value
    /// under the restored cache-wide defaults.
    fn restore(&mut self, snapshot: Snapshot<T>, now: DateTime<Utc>) -> usize {
        let Snapshot { entries, settings } = snapshot;

        self.index.clear();
        self.settings.cache_size = usize::try_from(settings.cache_size).unwrap_or(usize::MAX);
        self.settings.reset_after = settings.reset_after;
        self.settings.debug = settings.debug;
        self.settings.lifetime = settings.lifetime;
        self.settings.update_interval_secs = settings.update_interval_secs;
        self.settings.compressed = settings.compressed;
        self.settings.double_buffer = settings.double_buffer;
        self.stats = StatsTracker::restore(
            settings.hits,
            settings.misses,
            settings.actions,
            settings.sequence,
        );
        self.reaper.set_interval(settings.update_interval_secs);

        if !self.settings.enabled {
            warn!("Cache is disabled, snapshot entries were not restored");
            return 0;
        }

        let lifetime = self.settings.lifetime;
        let compressed = self.settings.compressed;
        let double_buffer = self.settings.double_buffer;
        let count = entries.len();
        for (key, value) in entries {
            self.admit(key, value, lifetime, compressed, double_buffer, now);
        }
        count
    }
}

impl<T: Cacheable> Default for ObjectCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Cacheable> ObjectCache<T> {
    // == Constructors ==
    /// Creates a cache with default settings.
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Creates a cache reading time from `clock`.
    ///
    /// If called inside a Tokio runtime, that runtime hosts the reaper.
    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        let reaper = Reaper::new(settings.update_interval_secs, Handle::try_current().ok());
        let state = CacheState {
            index: CapacityIndex::new(),
            stats: StatsTracker::new(),
            settings,
            reaper,
            destroyed: false,
        };

        Self {
            inner: Arc::new(Shared {
                state: Mutex::new(state),
                clock,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState<T>> {
        self.inner.state.lock()
    }

    fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    fn sweeper(&self) -> Weak<dyn Sweep> {
        let weak: Weak<Shared<T>> = Arc::downgrade(&self.inner);
        weak
    }

    // == Set ==
    /// Stores `value` under `key`.
    ///
    /// If the key already exists its entry is replaced. If the cache is at
    /// capacity the entries with the lowest sequence numbers are evicted.
    /// Does nothing while the cache is disabled.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: T,
        lifetime: impl Into<Lifetime>,
        compressed: bool,
        double_buffer: bool,
    ) {
        let key = key.into();
        let lifetime = lifetime.into();
        let now = self.now();
        let mut state = self.lock();

        if !state.is_live() {
            debug!(key = %key, "Cache is disabled, not storing");
            return;
        }

        state.admit(key, value, lifetime, compressed, double_buffer, now);

        if lifetime.is_finite() {
            state.reaper.ensure_started(self.sweeper());
        }
    }

    /// Stores `value` with the cache-wide lifetime and compression defaults.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        let (lifetime, compressed, double_buffer) = {
            let state = self.lock();
            (
                state.settings.lifetime,
                state.settings.compressed,
                state.settings.double_buffer,
            )
        };
        self.set(key, value, lifetime, compressed, double_buffer);
    }

    // == Get ==
    /// Retrieves a value and promotes its key to the newest position.
    ///
    /// Expired entries are purged and counted as misses.
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.now();
        let mut state = self.lock();

        if !state.is_live() {
            return None;
        }
        state.lookup(key, now)
    }

    /// True if `key` holds an unexpired entry. Does not promote or count.
    pub fn contains_key(&self, key: &str) -> bool {
        let now = self.now();
        self.lock()
            .index
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    // == Remove ==
    /// Removes `key` if present. Always counts as an action.
    pub fn remove_entry(&self, key: &str) {
        self.lock().remove_entry(key);
    }

    /// Removes every key containing `pattern`, returning how many went.
    pub fn remove_like(&self, pattern: &str) -> usize {
        let mut state = self.lock();
        let matching: Vec<String> = state
            .index
            .keys()
            .into_iter()
            .filter(|key| key.contains(pattern))
            .collect();

        for key in &matching {
            state.remove_entry(key);
        }
        matching.len()
    }

    // == Flush ==
    /// Drops every entry and resets the counters. Settings are kept.
    pub fn flush(&self) {
        self.lock().flush();
    }

    // == Destroy ==
    /// Stops the reaper and empties the cache for good.
    ///
    /// Afterwards `set` and `get` are no-ops, `save`/`load` fail with
    /// [`CacheError::Destroyed`].
    pub fn destroy(&self) {
        let mut state = self.lock();
        // The cancelled loop exits on its own; nothing waits for it here.
        let _ = state.reaper.stop();
        state.flush();
        state.destroyed = true;
        info!("Cache destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    // == Persistence ==
    /// Writes all live entries and the cache settings to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let now = self.now();
        let mut state = self.lock();

        if state.destroyed {
            return Err(CacheError::Destroyed);
        }

        let snapshot = state.snapshot(now)?;
        snapshot.write_to(path)?;

        info!(path = %path.display(), entries = snapshot.entries.len(), "Cache saved");
        Ok(())
    }

    /// Replaces the cache contents with the snapshot at `path`.
    ///
    /// Settings and counters are restored as saved; values are re-admitted
    /// under the restored defaults, which may evict if the snapshot holds
    /// more than the capacity. Nothing changes if reading fails.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let now = self.now();
        let mut state = self.lock();

        if state.destroyed {
            return Err(CacheError::Destroyed);
        }

        let snapshot = Snapshot::<T>::read_from(path)?;
        let restored = state.restore(snapshot, now);

        if state.settings.lifetime.is_finite() {
            state.reaper.ensure_started(self.sweeper());
        }

        info!(path = %path.display(), entries = restored, "Cache loaded");
        Ok(())
    }

    // == Introspection ==
    /// Current keys, oldest first. Only membership is meaningful.
    pub fn keys(&self) -> Vec<String> {
        self.lock().index.keys()
    }

    pub fn len(&self) -> usize {
        self.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().index.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        state.stats.snapshot(state.index.len())
    }

    pub fn cache_hit(&self) -> u64 {
        self.lock().stats.hits()
    }

    pub fn cache_miss(&self) -> u64 {
        self.lock().stats.misses()
    }

    /// Zeroes the hit and miss counters.
    pub fn reset_statistics(&self) {
        self.lock().stats.reset_hit_miss();
    }

    pub fn settings(&self) -> CacheSettings {
        self.lock().settings.clone()
    }

    pub fn reaper_state(&self) -> ReaperState {
        self.lock().reaper.state()
    }

    /// Checks that the internal key/sequence/entry maps agree.
    pub fn is_consistent(&self) -> bool {
        self.lock().index.is_consistent()
    }

    // == Memory Pressure ==
    /// Drops every decompressed shadow kept by double buffering.
    ///
    /// Returns how many shadows were released. Values stay readable; they
    /// are decompressed again on the next access.
    pub fn release_memory(&self) -> usize {
        let mut state = self.lock();
        let mut released = 0;
        for entry in state.index.entries_mut() {
            if entry.release_shadow() {
                released += 1;
            }
        }
        debug!(released, "Released decompressed shadows");
        released
    }

    // == Settings ==
    pub fn is_enabled(&self) -> bool {
        self.lock().settings.enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.lock().settings.enabled = enabled;
    }

    /// Takes effect at the next `set`. Zero is treated as one.
    pub fn set_cache_size(&self, size: usize) {
        self.lock().settings.cache_size = size;
    }

    /// Default lifetime for [`ObjectCache::insert`]; negative seconds mean forever.
    pub fn set_lifetime(&self, lifetime: impl Into<Lifetime>) {
        self.lock().settings.lifetime = lifetime.into();
    }

    /// None disables the action threshold.
    pub fn set_reset_after(&self, threshold: Option<u64>) {
        self.lock().settings.reset_after = threshold;
    }

    /// Seconds between reaper sweeps.
    pub fn set_update_interval(&self, secs: u64) {
        let mut state = self.lock();
        state.settings.update_interval_secs = secs;
        state.reaper.set_interval(secs);
    }

    pub fn set_compressed(&self, compressed: bool) {
        self.lock().settings.compressed = compressed;
    }

    pub fn set_double_buffer(&self, double_buffer: bool) {
        self.lock().settings.double_buffer = double_buffer;
    }

    pub fn set_debug(&self, debug: bool) {
        self.lock().settings.debug = debug;
    }
}

impl<T> fmt::Debug for ObjectCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ObjectCache")
            .field("entries", &state.index.len())
            .field("settings", &state.settings)
            .field("reaper", &state.reaper.state())
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
