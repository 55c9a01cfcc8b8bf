//! HTTP admin surface over an `ObjectCache<String>`.
//!
//! Handlers live in [`handlers`]; [`create_router`] wires them to paths.

pub mod handlers;
pub mod routes;

pub use handlers::AppState;
pub use routes::create_router;
