use std::sync::Arc;

use crate::{
    client::{AttendanceApi, ResourceInnClient},
    clock::{Clock, SystemClock},
    config::Config,
    error::Result,
    services::{activity::ActivityLog, attendance::AttendanceOrchestrator},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Decides and performs check-ins and check-outs.
    pub orchestrator: Arc<AttendanceOrchestrator>,
    /// The recent activity exposed by the status endpoint.
    pub activity: ActivityLog,
    /// The time source shared by every component.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Creates a new `AppState` talking to the configured ResourceInn tenant.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = ResourceInnClient::new(&config.api)?;
        tracing::info!("✅ ResourceInn client initialized for '{}'", config.api.subdomain);

        Ok(Self::with_client(config, Arc::new(client), Arc::new(SystemClock)))
    }

    /// Creates a new `AppState` around an arbitrary API client and clock.
    pub fn with_client(config: &Config, client: Arc<dyn AttendanceApi>, clock: Arc<dyn Clock>) -> Self {
        let activity = ActivityLog::new(clock.clone());
        let orchestrator = Arc::new(AttendanceOrchestrator::new(
            config,
            client,
            clock.clone(),
            activity.clone(),
        ));

        AppState {
            config: Arc::new(config.clone()),
            orchestrator,
            activity,
            clock,
        }
    }
}
