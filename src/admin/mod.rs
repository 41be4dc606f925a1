//! Admin API.
//!
//! Registry-facing operations: status, fleet statistics, backend updates,
//! fluctuation and latency edits. No authentication.

pub mod handlers;

use axum::{
    routing::{get, post, put},
    Router,
};

use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/stats", get(get_stats))
        .route("/admin/regions/stats", get(get_region_stats))
        .route("/admin/backends/{id}", post(update_backend))
        .route("/admin/fluctuate", post(fluctuate))
        .route("/admin/latency", put(update_latency))
        .with_state(state)
}
