use std::sync::Arc;

use thiserror::Error;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::{
    config::ScheduleConfig,
    models::attendance::AttendanceAction,
    services::{attendance::AttendanceOrchestrator, schedule::to_cron_expression},
};

/// An error raised while setting up the daily timers.
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Failed to create scheduler
    #[error("Failed to create scheduler: {0}")]
    CreationFailed(String),

    /// Failed to register job
    #[error("Failed to register job: {0}")]
    JobRegistrationFailed(String),

    /// Failed to start scheduler
    #[error("Failed to start scheduler: {0}")]
    StartFailed(String),
}

/// Registers the weekday check-in and check-out jobs and starts them.
///
/// # Arguments
///
/// * `orchestrator` - Invoked when a job fires.
/// * `schedule` - Trigger times and the timezone they are evaluated in.
///
/// # Returns
///
/// A `Result` containing the running `JobScheduler`. Dropping it does not
/// stop the jobs.
pub async fn start(
    orchestrator: Arc<AttendanceOrchestrator>,
    schedule: &ScheduleConfig,
) -> Result<JobScheduler, SchedulerError> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| SchedulerError::CreationFailed(e.to_string()))?;

    for action in [AttendanceAction::Checkin, AttendanceAction::Checkout] {
        let nominal = match action {
            AttendanceAction::Checkin => schedule.checkin_time,
            AttendanceAction::Checkout => schedule.checkout_time,
        };
        let expression = to_cron_expression(nominal);
        let job = attendance_job(&expression, schedule, action, orchestrator.clone())?;

        scheduler
            .add(job)
            .await
            .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))?;

        tracing::info!(
            "⏰ {} scheduled at {} ({}) [{}]",
            action.label(),
            nominal.format("%H:%M"),
            schedule.timezone,
            expression
        );
    }

    scheduler
        .start()
        .await
        .map_err(|e| SchedulerError::StartFailed(e.to_string()))?;

    Ok(scheduler)
}

fn attendance_job(
    expression: &str,
    schedule: &ScheduleConfig,
    action: AttendanceAction,
    orchestrator: Arc<AttendanceOrchestrator>,
) -> Result<Job, SchedulerError> {
    Job::new_async_tz(expression, schedule.timezone, move |_id, _lock| {
        let orchestrator = orchestrator.clone();

        Box::pin(async move {
            let outcome = match action {
                AttendanceAction::Checkin => orchestrator.run_scheduled_checkin().await,
                AttendanceAction::Checkout => orchestrator.run_scheduled_checkout().await,
            };
            tracing::debug!("⏰ Scheduled {} finished: {:?}", action, outcome.report().reason);
        })
    })
    .map_err(|e| SchedulerError::JobRegistrationFailed(e.to_string()))
}
