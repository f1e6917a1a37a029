//! Application error taxonomy.
//!
//! Four caller-visible failure classes plus an internal catch-all:
//! validation failures (including a rejected create against an existing
//! ongoing booking) are turned away before any state change, conflicts mean
//! a binding race lost (the caller must re-fetch and re-decide, never retry
//! blindly), not-found covers unknown or wrong-state references, and
//! exhaustion means dispatch ran out of batches at every attempted radius.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or out-of-range input, rejected before any state change
    #[error("{0}")]
    Validation(String),

    /// A binding race lost (double-accept, already-terminal cancel)
    #[error("{0}")]
    Conflict(String),

    /// Unknown booking/vendor, or a reference in the wrong state
    #[error("{0}")]
    NotFound(String),

    /// Dispatch exhausted all batches at all attempted radii
    #[error("no provider available: {0}")]
    Exhausted(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("record not found".to_string()),
            // The one unique index in the schema is the ongoing-booking
            // guard; the violation is a rejected create, reported as 400
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Validation(
                "an ongoing booking already exists for this customer".to_string(),
            ),
            other => AppError::Internal(other.into()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Exhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self {
            // Don't leak internal error chains to clients
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
