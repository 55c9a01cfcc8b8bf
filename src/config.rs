//! Configuration Module
//!
//! Cache policy settings and server configuration loaded from environment
//! variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::Lifetime;

// == Cache Settings ==
/// Cache-wide policy. Every field can be changed at runtime through the
/// corresponding `ObjectCache` setter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of entries the cache can hold
    pub cache_size: usize,
    /// Lifetime for entries stored without an explicit one
    pub lifetime: Lifetime,
    /// Flush everything after this many structural actions; None disables it
    pub reset_after: Option<u64>,
    /// Seconds between two reaper sweeps
    pub update_interval_secs: u64,
    /// Compress entries by default
    pub compressed: bool,
    /// Keep a decompressed shadow of compressed entries by default
    pub double_buffer: bool,
    pub enabled: bool,
    /// Log every hit and miss
    pub debug: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_size: 1000,
            lifetime: Lifetime::Forever,
            reset_after: Some(1_000_000),
            update_interval_secs: 60,
            compressed: false,
            double_buffer: false,
            enabled: true,
            debug: false,
        }
    }
}

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheSettings,
    /// HTTP server port
    pub server_port: u16,
    /// Where snapshots are saved on shutdown and loaded on startup
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_SIZE` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds, negative = forever (default: -1)
    /// - `RESET_AFTER` - Actions before a full flush, negative = never (default: 1000000)
    /// - `UPDATE_INTERVAL` - Reaper sweep interval in seconds (default: 60)
    /// - `COMPRESSED` - Compress entries by default (default: false)
    /// - `DOUBLE_BUFFER` - Keep decompressed shadows (default: false)
    /// - `CACHE_ENABLED` - (default: true)
    /// - `CACHE_DEBUG` - Log hits and misses (default: false)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SNAPSHOT_PATH` - Snapshot file (default: unset)
    pub fn from_env() -> Self {
        let defaults = CacheSettings::default();

        let reset_after = match env_or::<i64>("RESET_AFTER", 1_000_000) {
            n if n < 0 => None,
            n => Some(n.unsigned_abs()),
        };

        let cache = CacheSettings {
            cache_size: env_or("CACHE_SIZE", defaults.cache_size),
            lifetime: Lifetime::from(env_or::<i64>("DEFAULT_TTL", -1)),
            reset_after,
            update_interval_secs: env_or("UPDATE_INTERVAL", defaults.update_interval_secs),
            compressed: env_or("COMPRESSED", defaults.compressed),
            double_buffer: env_or("DOUBLE_BUFFER", defaults.double_buffer),
            enabled: env_or("CACHE_ENABLED", defaults.enabled),
            debug: env_or("CACHE_DEBUG", defaults.debug),
        };

        Self {
            cache,
            server_port: env_or("SERVER_PORT", 3000),
            snapshot_path: env::var("SNAPSHOT_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            server_port: 3000,
            snapshot_path: None,
        }
    }
}
