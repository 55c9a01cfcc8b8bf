//! Cache Module
//!
//! Provides the in-process object cache: capacity index with promote-on-hit
//! eviction, TTL expiry, optional compression and snapshot persistence.

mod clock;
mod codec;
mod entry;
mod index;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{CacheEntry, Cacheable, Lifetime};
pub use index::{CapacityIndex, EvictedSlot};
pub use stats::{CacheStats, StatsTracker, COUNTER_CEILING};
pub use store::ObjectCache;
