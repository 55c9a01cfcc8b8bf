//! Response bodies produced by the cache admin API

use chrono::Utc;
use serde::Serialize;

use crate::cache::CacheStats;

/// `GET /get/:key`
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: String,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Acknowledgement for writes, flushes, statistics resets and snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
    /// Key the message refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            key: None,
        }
    }

    pub fn stored(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Stored '{}'", key),
            key: Some(key),
        }
    }
}

/// `DELETE /del/:key` and `DELETE /like/:pattern`
#[derive(Debug, Clone, Serialize)]
pub struct RemovedResponse {
    /// Exact key or substring pattern
    pub matched: String,
    pub removed: usize,
}

impl RemovedResponse {
    pub fn new(matched: impl Into<String>, removed: usize) -> Self {
        Self {
            matched: matched.into(),
            removed,
        }
    }
}

/// `GET /keys`, oldest first
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub count: usize,
    pub keys: Vec<String>,
}

impl From<Vec<String>> for KeysResponse {
    fn from(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// `GET /stats`: the raw counters plus the derived hit rate.
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// RFC 3339
    pub timestamp: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy",
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Body of every non-2xx response
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
