//! HTTP request and response bodies

pub mod requests;
pub mod responses;

pub use requests::{SetRequest, StoreOptions, MAX_KEY_LENGTH};
pub use responses::{
    ErrorResponse, GetResponse, HealthResponse, KeysResponse, MessageResponse, RemovedResponse,
    StatsResponse,
};
