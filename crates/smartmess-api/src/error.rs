use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AppState;

/// The request-level error taxonomy. Every variant renders as the uniform
/// `{"success": false, "message": ...}` envelope; unexpected failures are
/// logged server-side and surfaced as a generic 500.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("Your account is awaiting admin approval.")]
    PendingApproval,

    #[error("Your account has been disabled. Contact the mess office.")]
    AccountDisabled,

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, None),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, None),
            ApiError::PendingApproval => (StatusCode::FORBIDDEN, Some("pending_approval")),
            ApiError::AccountDisabled => (StatusCode::FORBIDDEN, Some("account_disabled")),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, None),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, None),
            ApiError::Conflict(_) => (StatusCode::BAD_REQUEST, Some("conflict")),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, None),
        };

        let message = match &self {
            // Never leak datastore internals to the client.
            ApiError::Internal(e) => {
                error!("unhandled error: {e:#}");
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({ "success": false, "message": message });
        if let Some(code) = code {
            body["code"] = json!(code);
        }

        (status, Json(body)).into_response()
    }
}

/// Run a closure against the database on the blocking pool. SQLite calls are
/// synchronous and must stay off the async executor.
pub async fn with_db<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&smartmess_db::Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("task join error"))
        })?
}
