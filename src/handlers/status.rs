use axum::{extract::State, http::StatusCode, response::Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::Result,
    handlers::response::json,
    services::{activity::ActivityEntry, attendance::AttendanceSnapshot},
    state::AppState,
};

/// How many activity entries the status endpoint returns.
pub const STATUS_LOG_LIMIT: usize = 20;

/// The effective configuration echoed by the status endpoint.
#[derive(Serialize, Debug)]
pub struct StatusConfig {
    pub checkin_time: String,
    pub checkout_time: String,
    pub timezone: String,
    pub require_location: bool,
    pub office_radius: f64,
}

/// The response payload for `GET /api/status`.
#[derive(Serialize, Debug)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub attendance: AttendanceSnapshot,
    pub config: StatusConfig,
    pub log: Vec<ActivityEntry>,
}

#[derive(Serialize, Debug)]
pub struct HealthResponse {
    pub status: &'static str,
    pub time: DateTime<Utc>,
}

/// Reports attendance, location and session state plus recent activity.
///
/// # Arguments
///
/// * `state` - The application's state.
///
/// # Returns
///
/// A `Result` containing the rendered `StatusResponse`.
pub async fn status(State(state): State<AppState>) -> Result<Response> {
    let config = &state.config;

    let response = StatusResponse {
        attendance: state.orchestrator.snapshot(),
        config: StatusConfig {
            checkin_time: config.schedule.checkin_time.format("%H:%M").to_string(),
            checkout_time: config.schedule.checkout_time.format("%H:%M").to_string(),
            timezone: config.schedule.timezone.name().to_string(),
            require_location: config.features.require_location,
            office_radius: config.office.radius_meters,
        },
        log: state.activity.recent(STATUS_LOG_LIMIT),
    };

    json(StatusCode::OK, &response)
}

pub async fn health(State(state): State<AppState>) -> Result<Response> {
    let response = HealthResponse {
        status: "ok",
        time: state.clock.now(),
    };

    json(StatusCode::OK, &response)
}
