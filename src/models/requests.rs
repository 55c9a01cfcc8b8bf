//! Request bodies accepted by the cache admin API

use serde::Deserialize;

use crate::cache::Lifetime;
use crate::config::CacheSettings;
use crate::error::CacheError;

/// Longest key accepted over HTTP, in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Body of `PUT /set`. Unset options take the cache-wide defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    /// Seconds to live; negative never expires
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub compressed: Option<bool>,
    #[serde(default)]
    pub double_buffer: Option<bool>,
}

/// Storage options of a [`SetRequest`] after defaults are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub lifetime: Lifetime,
    pub compressed: bool,
    pub double_buffer: bool,
}

impl SetRequest {
    /// Rejects empty and oversized keys.
    pub fn validate(&self) -> Result<(), CacheError> {
        if self.key.is_empty() {
            return Err(CacheError::InvalidRequest("Key cannot be empty".to_string()));
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "Key is {} bytes, the limit is {}",
                self.key.len(),
                MAX_KEY_LENGTH
            )));
        }
        Ok(())
    }

    pub fn options(&self, defaults: &CacheSettings) -> StoreOptions {
        StoreOptions {
            lifetime: self.ttl.map_or(defaults.lifetime, Lifetime::from),
            compressed: self.compressed.unwrap_or(defaults.compressed),
            double_buffer: self.double_buffer.unwrap_or(defaults.double_buffer),
        }
    }
}
