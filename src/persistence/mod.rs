//! Persistence Module
//!
//! Best-effort snapshot and restore of the cache contents. Saving and loading
//! themselves are driven by `ObjectCache::save` / `ObjectCache::load`, which
//! hold the cache lock for the whole operation.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotSettings};
