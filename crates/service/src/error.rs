//! Unified error handling with Sentry integration.
//!
//! Provides the service-level [`FollowupError`] returned by the orchestrator
//! and attributor, and an HTTP-facing [`AppError`] that captures server
//! errors to Sentry before responding. Route handlers return
//! `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::RepositoryError;
use crate::scheduler::SchedulerError;

/// Error from the cart-tracking core: either a store or a scheduler failure.
///
/// Nothing here is retried; a failed operation propagates to the enclosing
/// request handler and the next lifecycle event converges the state again.
#[derive(Debug, Error)]
pub enum FollowupError {
    /// A snapshot, dedup, session, or order store operation failed.
    #[error("store error: {0}")]
    Store(#[from] RepositoryError),

    /// The email scheduler collaborator failed.
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Application-level error type for the HTTP surface.
#[derive(Debug, Error)]
pub enum AppError {
    /// Core operation failed.
    #[error("Followup error: {0}")]
    Followup(#[from] FollowupError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Anti-forgery token check failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Followup(_) | Self::Database(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Followup(FollowupError::Scheduler(_)) => StatusCode::BAD_GATEWAY,
            Self::Followup(FollowupError::Store(_)) | Self::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Followup(FollowupError::Scheduler(_)) => "External service error".to_string(),
            Self::Followup(FollowupError::Store(_)) | Self::Database(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
