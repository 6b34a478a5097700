use axum::{extract::State, http::StatusCode, response::Response};
use serde::Serialize;

use crate::{
    error::Result,
    handlers::response::json,
    models::attendance::TriggerReason,
    state::AppState,
};

/// The response payload for a forced login.
#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Checks in on request, subject to the same daily guard as every trigger.
pub async fn checkin(State(state): State<AppState>) -> Result<Response> {
    let outcome = state.orchestrator.perform_checkin(TriggerReason::Manual).await;
    json(StatusCode::OK, &outcome.report())
}

/// Checks out on request, subject to the same daily guard as every trigger.
pub async fn checkout(State(state): State<AppState>) -> Result<Response> {
    let outcome = state.orchestrator.perform_checkout(TriggerReason::Manual).await;
    json(StatusCode::OK, &outcome.report())
}

/// Forces a fresh login exchange.
pub async fn login(State(state): State<AppState>) -> Result<Response> {
    let response = match state.orchestrator.login().await {
        Ok(()) => LoginResponse {
            success: true,
            reason: None,
        },
        Err(e) => LoginResponse {
            success: false,
            reason: Some(e.to_string()),
        },
    };

    json(StatusCode::OK, &response)
}
