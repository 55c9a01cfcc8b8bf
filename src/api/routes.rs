//! Router construction for the admin API.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, flush_handler, get_handler, health_handler, keys_handler, load_handler,
    remove_like_handler, reset_stats_handler, save_handler, set_handler, settings_handler,
    stats_handler, AppState,
};

/// Builds the admin router around `state`.
///
/// | Method | Path              | Operation                      |
/// |--------|-------------------|--------------------------------|
/// | PUT    | `/set`            | store a value                  |
/// | GET    | `/get/:key`       | read and promote               |
/// | DELETE | `/del/:key`       | remove one key                 |
/// | DELETE | `/like/:pattern`  | remove keys containing pattern |
/// | POST   | `/flush`          | drop everything                |
/// | GET    | `/keys`           | list keys, oldest first        |
/// | GET    | `/stats`          | counters and hit rate          |
/// | POST   | `/stats/reset`    | zero hits and misses           |
/// | GET    | `/settings`       | cache-wide settings            |
/// | POST   | `/snapshot/save`  | write the snapshot file        |
/// | POST   | `/snapshot/load`  | restore from the snapshot file |
/// | GET    | `/health`         | liveness                       |
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let entries = Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/like/:pattern", delete(remove_like_handler))
        .route("/flush", post(flush_handler))
        .route("/keys", get(keys_handler));

    let admin = Router::new()
        .route("/stats", get(stats_handler))
        .route("/stats/reset", post(reset_stats_handler))
        .route("/settings", get(settings_handler))
        .route("/snapshot/save", post(save_handler))
        .route("/snapshot/load", post(load_handler))
        .route("/health", get(health_handler));

    entries
        .merge(admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
