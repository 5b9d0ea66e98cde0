//! HTTP REST API endpoints, implemented with Axum.

pub mod routes;
pub mod state;

pub use routes::{create_router, ApiError, DEFAULT_LIST_LIMIT};
pub use state::AppState;
