use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{client::ApiError, scheduler::SchedulerError};

/// The application's error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A remote API error.
    #[error("Remote API error: {0}")]
    Remote(#[from] ApiError),

    /// A scheduler error.
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// An internal server error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// A `Result` type that uses `AppError` as the error type.
pub type Result<T> = std::result::Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(ref msg) => {
                tracing::debug!("Validation error: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }

            AppError::Remote(ref e) => {
                tracing::error!("Remote API error: {}", e);
                (StatusCode::BAD_GATEWAY, "Remote API error".to_string())
            }

            AppError::Scheduler(ref e) => {
                tracing::error!("Scheduler error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Scheduler error".to_string())
            }

            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = sonic_rs::to_string(&sonic_rs::json!({
            "error": message
        }))
        .unwrap_or_else(|_| r#"{"error":"Internal server error"}"#.to_string());

        (status, [(axum::http::header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}
