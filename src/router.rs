use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post},
};
use http::{Method, header};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    error::{AppError, Result},
    handlers,
    state::AppState,
};

/// Seconds after which one manual request is replenished.
const MANUAL_REPLENISH_SECS: u64 = 6;
/// Manual requests allowed in a burst, shared by all clients.
const MANUAL_BURST: u32 = 10;

/// Builds the HTTP application.
///
/// # Arguments
///
/// * `state` - The application's state.
///
/// # Returns
///
/// A `Result` containing the `Router`.
pub fn router(state: AppState) -> Result<Router> {
    let manual_governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(GlobalKeyExtractor)
            .per_second(MANUAL_REPLENISH_SECS)
            .burst_size(MANUAL_BURST)
            .use_headers()
            .finish()
            .ok_or_else(|| AppError::Internal("invalid manual rate limit".to_string()))?,
    );

    let manual_routes = Router::new()
        .route("/api/manual/checkin", post(handlers::manual::checkin))
        .route("/api/manual/checkout", post(handlers::manual::checkout))
        .route("/api/manual/login", post(handlers::manual::login))
        .layer(GovernorLayer::new(manual_governor_conf))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/location-ping", post(handlers::location::location_ping))
        .route("/api/status", get(handlers::status::status))
        .route("/health", get(handlers::status::health))
        .with_state(state.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(Duration::from_secs(86400));

    let app = Router::new()
        .merge(api_routes)
        .merge(manual_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(cors)
        .fallback_service(ServeDir::new(&state.config.static_dir));

    Ok(app)
}
