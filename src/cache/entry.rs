//! Cache Entry Module
//!
//! Defines the wrapped value stored for every key: payload, lifetime and
//! compression state.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::cache::codec;
use crate::error::Result;

// == Cacheable ==
/// Bounds every cached value type must satisfy.
///
/// Serialization is needed for compressed entries and snapshots. Types that
/// bincode cannot deserialize (anything relying on `deserialize_any`, such as
/// `serde_json::Value`) are stored uncompressed and fail to load from a
/// snapshot.
pub trait Cacheable: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Cacheable for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

// == Lifetime ==
/// How long an entry lives after it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Lifetime {
    /// Never expires
    #[default]
    Forever,
    /// Expires this many seconds after creation
    Seconds(u64),
}

impl Lifetime {
    pub fn is_finite(&self) -> bool {
        matches!(self, Lifetime::Seconds(_))
    }

    /// Seconds as a signed count, `-1` for [`Lifetime::Forever`].
    pub fn as_secs(&self) -> i64 {
        match self {
            Lifetime::Forever => -1,
            Lifetime::Seconds(secs) => i64::try_from(*secs).unwrap_or(i64::MAX),
        }
    }
}

impl From<i64> for Lifetime {
    /// Negative values mean "never expires".
    fn from(secs: i64) -> Self {
        u64::try_from(secs).map_or(Lifetime::Forever, Lifetime::Seconds)
    }
}

impl From<Option<u64>> for Lifetime {
    fn from(secs: Option<u64>) -> Self {
        secs.map_or(Lifetime::Forever, Lifetime::Seconds)
    }
}

// == Payload ==
/// Stored form of a cached value.
#[derive(Debug, Clone)]
enum Payload<T> {
    Plain(T),
    Compressed {
        bytes: Vec<u8>,
        /// Decompressed copy kept by double buffering; reclaimable.
        shadow: Option<T>,
    },
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    payload: Payload<T>,
    /// Insertion timestamp
    created_at: DateTime<Utc>,
    lifetime: Lifetime,
    double_buffer: bool,
}

impl<T: Cacheable> CacheEntry<T> {
    // == Constructor ==
    /// Wraps `value`, compressing it when asked.
    ///
    /// A value that does not survive a bincode round trip is kept
    /// uncompressed.
    pub fn new(
        value: T,
        created_at: DateTime<Utc>,
        lifetime: Lifetime,
        compressed: bool,
        double_buffer: bool,
    ) -> Self {
        let payload = if compressed {
            match codec::compress(&value) {
                Ok(bytes) => Payload::Compressed {
                    bytes,
                    shadow: double_buffer.then_some(value),
                },
                Err(err) => {
                    warn!(error = %err, "Compression failed, storing value uncompressed");
                    Payload::Plain(value)
                }
            }
        } else {
            Payload::Plain(value)
        };

        Self {
            payload,
            created_at,
            lifetime,
            double_buffer,
        }
    }

    // == Value ==
    /// Returns the stored value, decompressing it if necessary.
    ///
    /// With double buffering enabled the decoded value is kept as the shadow
    /// so the next read skips decompression.
    pub fn value(&mut self) -> Result<T> {
        match &mut self.payload {
            Payload::Plain(value) => Ok(value.clone()),
            Payload::Compressed { shadow: Some(v), .. } => Ok(v.clone()),
            Payload::Compressed { bytes, shadow } => {
                let value: T = codec::decompress(bytes)?;
                if self.double_buffer {
                    *shadow = Some(value.clone());
                }
                Ok(value)
            }
        }
    }

    /// Returns the stored value without populating the shadow.
    pub fn snapshot_value(&self) -> Result<T> {
        match &self.payload {
            Payload::Plain(value) => Ok(value.clone()),
            Payload::Compressed { shadow: Some(v), .. } => Ok(v.clone()),
            Payload::Compressed { bytes, .. } => codec::decompress(bytes),
        }
    }
}

impl<T> CacheEntry<T> {
    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// An entry is expired once `now >= created_at + lifetime`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Expiration timestamp, None = no expiration.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.lifetime {
            Lifetime::Forever => None,
            Lifetime::Seconds(secs) => {
                let secs = i64::try_from(secs).unwrap_or(i64::MAX);
                Duration::try_seconds(secs)
                    .and_then(|ttl| self.created_at.checked_add_signed(ttl))
                    .or(Some(DateTime::<Utc>::MAX_UTC))
            }
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self.payload, Payload::Compressed { .. })
    }

    pub fn has_shadow(&self) -> bool {
        matches!(self.payload, Payload::Compressed { shadow: Some(_), .. })
    }

    /// Drops the decompressed shadow. Returns true if one was held.
    pub fn release_shadow(&mut self) -> bool {
        match &mut self.payload {
            Payload::Compressed { shadow, .. } => shadow.take().is_some(),
            Payload::Plain(_) => false,
        }
    }
}
