use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use favsync_worker::TriggerError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A manual trigger was refused.
    #[error(transparent)]
    Trigger(#[from] TriggerError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Trigger(TriggerError::Busy) => (
                StatusCode::CONFLICT,
                "A download job is already running".to_string(),
            ),
        };

        let body = json!({
            "success": false,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
