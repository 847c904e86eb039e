pub mod health;
pub mod status;

use axum::Router;

use crate::state::AppState;

/// All routes nested under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new().merge(status::router())
}
