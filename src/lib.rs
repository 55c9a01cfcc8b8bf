//! objcache - An in-process object cache
//!
//! Fixed-capacity key/value store with promote-on-hit eviction, per-entry
//! TTL, optional compression, a background expiry reaper and snapshot
//! persistence, plus a small HTTP admin surface.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod tasks;

pub use api::AppState;
pub use cache::{Lifetime, ObjectCache};
pub use config::{CacheSettings, Config};
pub use error::{CacheError, Result};
