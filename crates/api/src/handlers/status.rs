//! Handlers for the dashboard status endpoints.

use axum::extract::State;
use axum::Json;
use chrono::Local;
use favsync_core::{CurrentItem, FavoritesCount, RunPhase, RunStats, RunStatus, Timestamp};
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Shown instead of a time that has not happened yet.
const NEVER: &str = "Never";

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body of `GET /api/status`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub is_running: bool,
    pub current_status: RunPhase,
    /// Local time as `%Y-%m-%d %H:%M:%S`, or `"Never"`.
    pub last_run: String,
    /// Unix seconds.
    pub last_run_timestamp: Option<f64>,
    pub next_run: String,
    pub next_run_timestamp: Option<f64>,
    pub stats: RunStats,
    pub favorites_count: FavoritesCount,
    pub current_item: Option<CurrentItem>,
}

impl StatusResponse {
    pub fn new(status: RunStatus, is_running: bool) -> Self {
        Self {
            is_running,
            current_status: status.phase,
            last_run: format_timestamp(status.last_run_at),
            last_run_timestamp: status.last_run_at.map(unix_seconds),
            next_run: format_timestamp(status.next_run_at),
            next_run_timestamp: status.next_run_at.map(unix_seconds),
            stats: status.stats,
            favorites_count: status.favorites_count,
            current_item: status.current_item,
        }
    }
}

/// Body of a successful `POST /api/trigger`.
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
}

fn format_timestamp(at: Option<Timestamp>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| NEVER.to_string())
}

fn unix_seconds(at: Timestamp) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::new(
        state.status.snapshot(),
        state.scheduler.is_running(),
    ))
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<RunStats> {
    Json(state.status.stats())
}

/// POST /api/trigger
///
/// Starts a run in the background and returns right away. Responds 409
/// while another run is active.
pub async fn trigger_run(State(state): State<AppState>) -> AppResult<Json<TriggerResponse>> {
    // The run task is detached; its outcome lands in the status store.
    let _run = state.scheduler.trigger_now()?;

    Ok(Json(TriggerResponse {
        success: true,
        message: "Download job started".to_string(),
    }))
}
