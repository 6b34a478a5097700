use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::Response,
};

use crate::{
    error::{AppError, Result},
    handlers::response::json,
    state::AppState,
    validation::location::{LocationPingRequest, validate_location_ping},
};

/// Handles a location ping from the user's device.
///
/// Every valid ping replaces the stored location; a ping inside the office
/// perimeter during the check-in window also attempts a check-in.
///
/// # Arguments
///
/// * `state` - The application's state.
/// * `payload` - The decoded `{lat, lng}` body.
///
/// # Returns
///
/// A `Result` containing the `LocationReport`.
pub async fn location_ping(
    State(state): State<AppState>,
    payload: std::result::Result<Json<LocationPingRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let (lat, lng) = validate_location_ping(&payload)?;

    let report = state.orchestrator.handle_location_ping(lat, lng).await;
    json(StatusCode::OK, &report)
}
