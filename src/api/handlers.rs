//! API Handlers
//!
//! One async function per admin endpoint. Handlers only translate between
//! HTTP bodies and `ObjectCache` calls.

use std::path::PathBuf;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::ObjectCache;
use crate::config::{CacheSettings, Config};
use crate::error::{CacheError, Result};
use crate::models::{
    GetResponse, HealthResponse, KeysResponse, MessageResponse, RemovedResponse, SetRequest,
    StatsResponse,
};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: ObjectCache<String>,
    /// Target of the snapshot endpoints; they answer 400 while unset
    pub snapshot_path: Option<PathBuf>,
}

impl AppState {
    pub fn new(cache: ObjectCache<String>) -> Self {
        Self {
            cache,
            snapshot_path: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            cache: ObjectCache::with_settings(config.cache.clone()),
            snapshot_path: config.snapshot_path.clone(),
        }
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    fn snapshot_path(&self) -> Result<PathBuf> {
        self.snapshot_path
            .clone()
            .ok_or_else(|| CacheError::InvalidRequest("No snapshot path configured".to_string()))
    }
}

// == Entries ==

/// PUT /set
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<MessageResponse>> {
    req.validate()?;
    if state.cache.is_destroyed() {
        return Err(CacheError::Destroyed);
    }

    let options = req.options(&state.cache.settings());
    state.cache.set(
        req.key.clone(),
        req.value,
        options.lifetime,
        options.compressed,
        options.double_buffer,
    );

    Ok(Json(MessageResponse::stored(req.key)))
}

/// GET /get/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    match state.cache.get(&key) {
        Some(value) => Ok(Json(GetResponse::new(key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// DELETE /del/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RemovedResponse>> {
    if !state.cache.contains_key(&key) {
        return Err(CacheError::NotFound(key));
    }
    state.cache.remove_entry(&key);

    Ok(Json(RemovedResponse::new(key, 1)))
}

/// DELETE /like/:pattern
pub async fn remove_like_handler(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Json<RemovedResponse> {
    let removed = state.cache.remove_like(&pattern);
    Json(RemovedResponse::new(pattern, removed))
}

/// POST /flush
pub async fn flush_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.flush();
    Json(MessageResponse::new("Cache flushed"))
}

/// GET /keys
pub async fn keys_handler(State(state): State<AppState>) -> Json<KeysResponse> {
    Json(KeysResponse::from(state.cache.keys()))
}

// == Introspection ==

/// GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// POST /stats/reset
pub async fn reset_stats_handler(State(state): State<AppState>) -> Json<MessageResponse> {
    state.cache.reset_statistics();
    Json(MessageResponse::new("Statistics reset"))
}

/// GET /settings
pub async fn settings_handler(State(state): State<AppState>) -> Json<CacheSettings> {
    Json(state.cache.settings())
}

// == Snapshots ==

/// POST /snapshot/save
///
/// The file is written on the blocking pool; the cache stays locked until
/// it is done.
pub async fn save_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    let path = state.snapshot_path()?;
    let cache = state.cache.clone();
    let target = path.clone();

    tokio::task::spawn_blocking(move || cache.save(target))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))??;

    Ok(Json(MessageResponse::new(format!(
        "Snapshot saved to {}",
        path.display()
    ))))
}

/// POST /snapshot/load
pub async fn load_handler(State(state): State<AppState>) -> Result<Json<MessageResponse>> {
    let path = state.snapshot_path()?;
    let cache = state.cache.clone();
    let source = path.clone();

    tokio::task::spawn_blocking(move || cache.load(source))
        .await
        .map_err(|e| CacheError::Internal(e.to_string()))??;

    Ok(Json(MessageResponse::new(format!(
        "Snapshot loaded from {}",
        path.display()
    ))))
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Lifetime;

    fn request(key: &str, value: &str) -> SetRequest {
        SetRequest {
            key: key.to_string(),
            value: value.to_string(),
            ttl: None,
            compressed: None,
            double_buffer: None,
        }
    }

    fn state() -> AppState {
        AppState::new(ObjectCache::new())
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let state = state();

        let stored = set_handler(State(state.clone()), Json(request("0025", "payload")))
            .await
            .unwrap();
        assert_eq!(stored.key.as_deref(), Some("0025"));

        let response = get_handler(State(state), Path("0025".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "payload");
    }

    #[tokio::test]
    async fn test_set_uses_cache_defaults() {
        let state = state();
        state.cache.set_compressed(true);
        state.cache.set_lifetime(Lifetime::Seconds(600));

        set_handler(State(state.clone()), Json(request("packed", &"xml ".repeat(200))))
            .await
            .unwrap();

        let response = get_handler(State(state), Path("packed".to_string()))
            .await
            .unwrap();
        assert_eq!(response.value, "xml ".repeat(200));
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let result = get_handler(State(state()), Path("nope".to_string())).await;
        assert!(matches!(result, Err(CacheError::NotFound(key)) if key == "nope"));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let state = state();
        set_handler(State(state.clone()), Json(request("gone", "v")))
            .await
            .unwrap();

        let response = delete_handler(State(state.clone()), Path("gone".to_string()))
            .await
            .unwrap();
        assert_eq!(response.removed, 1);
        assert!(!state.cache.contains_key("gone"));

        let again = delete_handler(State(state), Path("gone".to_string())).await;
        assert!(matches!(again, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_like_handler() {
        let state = state();
        for key in ["doc-1", "doc-2", "report-1"] {
            set_handler(State(state.clone()), Json(request(key, "v")))
                .await
                .unwrap();
        }

        let response = remove_like_handler(State(state.clone()), Path("doc-".to_string())).await;
        assert_eq!(response.removed, 2);

        let keys = keys_handler(State(state)).await;
        assert_eq!(keys.keys, vec!["report-1"]);
    }

    #[tokio::test]
    async fn test_stats_and_reset() {
        let state = state();
        let _ = get_handler(State(state.clone()), Path("missing".to_string())).await;

        let response = stats_handler(State(state.clone())).await;
        assert_eq!(response.stats.misses, 1);
        assert_eq!(response.hit_rate, 0.0);

        reset_stats_handler(State(state.clone())).await;
        assert_eq!(stats_handler(State(state)).await.stats.misses, 0);
    }

    #[tokio::test]
    async fn test_settings_handler() {
        let state = state();
        state.cache.set_cache_size(42);

        let settings = settings_handler(State(state)).await;
        assert_eq!(settings.cache_size, 42);
    }

    #[tokio::test]
    async fn test_flush_handler() {
        let state = state();
        set_handler(State(state.clone()), Json(request("k", "v")))
            .await
            .unwrap();

        flush_handler(State(state.clone())).await;
        assert!(state.cache.is_empty());
    }

    #[tokio::test]
    async fn test_set_rejects_bad_key_and_destroyed_cache() {
        let state = state();

        let empty = set_handler(State(state.clone()), Json(request("", "v"))).await;
        assert!(matches!(empty, Err(CacheError::InvalidRequest(_))));

        state.cache.destroy();
        let destroyed = set_handler(State(state), Json(request("k", "v"))).await;
        assert!(matches!(destroyed, Err(CacheError::Destroyed)));
    }

    #[tokio::test]
    async fn test_snapshot_requires_path() {
        let state = state();

        assert!(matches!(
            save_handler(State(state.clone())).await,
            Err(CacheError::InvalidRequest(_))
        ));
        assert!(matches!(
            load_handler(State(state)).await,
            Err(CacheError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_snapshot_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let state = state().with_snapshot_path(dir.path().join("c.snap"));
        set_handler(State(state.clone()), Json(request("k", "v")))
            .await
            .unwrap();

        save_handler(State(state.clone())).await.unwrap();
        state.cache.flush();
        load_handler(State(state.clone())).await.unwrap();

        assert_eq!(state.cache.get("k"), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_health_handler() {
        assert_eq!(health_handler().await.status, "healthy");
    }
}
