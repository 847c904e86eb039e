//! Route definitions for the dashboard status API.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::status;
use crate::state::AppState;

/// Status routes mounted at `/api`.
///
/// ```text
/// GET  /status   -> get_status
/// GET  /stats    -> get_stats
/// POST /trigger  -> trigger_run
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(status::get_status))
        .route("/stats", get(status::get_stats))
        .route("/trigger", post(status::trigger_run))
}
