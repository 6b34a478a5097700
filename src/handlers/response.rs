use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{AppError, Result};

/// Renders `value` as a JSON response with sonic-rs.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response> {
    let body = sonic_rs::to_string(value)
        .map_err(|e| AppError::Internal(format!("response serialization failed: {e}")))?;

    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}
