use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{
    client::AttendanceApi,
    clock::Clock,
    config::{Config, FeatureFlags, OfficeGeofence, ScheduleConfig},
    models::{
        attendance::{ActionOutcome, AttendanceAction, AttendanceRecord, FailureReason, SkipReason, TriggerReason},
        location::{LocationReport, LocationSample, OUTSIDE_PERIMETER, OUTSIDE_WINDOW},
        payload::AttendancePayload,
        session::SessionStatus,
    },
    services::{
        activity::{ActivityLevel, ActivityLog},
        daily_guard::DailyActionGuard,
        geofence,
        schedule::is_within_checkin_window,
        session::{AuthError, SessionManager},
    },
};

/// The attendance record plus the per-action in-flight markers.
#[derive(Debug, Default)]
struct AttendanceBook {
    record: AttendanceRecord,
    checkin_in_flight: bool,
    checkout_in_flight: bool,
}

impl AttendanceBook {
    fn in_flight_mut(&mut self, action: AttendanceAction) -> &mut bool {
        match action {
            AttendanceAction::Checkin => &mut self.checkin_in_flight,
            AttendanceAction::Checkout => &mut self.checkout_in_flight,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct LocationState {
    sample: Option<LocationSample>,
    confirmed: bool,
}

/// Clears an action's in-flight marker when dropped.
struct InFlight<'a> {
    book: &'a Mutex<AttendanceBook>,
    action: AttendanceAction,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        *self.book.lock().in_flight_mut(self.action) = false;
    }
}

/// Everything the status endpoint reports about attendance state.
#[derive(Debug, Clone, Serialize)]
pub struct AttendanceSnapshot {
    pub last_checkin: Option<DateTime<Utc>>,
    pub last_checkout: Option<DateTime<Utc>>,
    pub last_location: Option<LocationSample>,
    pub location_confirmed: bool,
    pub in_perimeter: bool,
    pub distance_to_office: Option<f64>,
    #[serde(flatten)]
    pub session: SessionStatus,
}

/// Decides whether a check-in or check-out should fire and performs it.
///
/// The orchestrator is timer-agnostic: the cron scheduler, location pings and
/// manual requests all call into it directly.
pub struct AttendanceOrchestrator {
    client: Arc<dyn AttendanceApi>,
    sessions: Arc<SessionManager>,
    guard: DailyActionGuard,
    schedule: ScheduleConfig,
    office: OfficeGeofence,
    features: FeatureFlags,
    shift: Option<sonic_rs::Value>,
    clock: Arc<dyn Clock>,
    activity: ActivityLog,
    book: Mutex<AttendanceBook>,
    location: Mutex<LocationState>,
}

impl AttendanceOrchestrator {
    /// Creates a new `AttendanceOrchestrator` with empty state.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    /// * `client` - The remote API client.
    /// * `clock` - The time source for every decision.
    /// * `activity` - Where outcomes are recorded.
    pub fn new(
        config: &Config,
        client: Arc<dyn AttendanceApi>,
        clock: Arc<dyn Clock>,
        activity: ActivityLog,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            client.clone(),
            config.credentials.clone(),
            clock.clone(),
            activity.clone(),
        ));

        Self {
            client,
            sessions,
            guard: DailyActionGuard::new(config.schedule.timezone),
            schedule: config.schedule,
            office: config.office,
            features: config.features,
            shift: config.api.shift.clone(),
            clock,
            activity,
            book: Mutex::new(AttendanceBook::default()),
            location: Mutex::new(LocationState::default()),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Forces a fresh login exchange.
    pub async fn login(&self) -> Result<(), AuthError> {
        self.sessions.login().await
    }

    /// Checks in unless today's check-in already succeeded.
    pub async fn perform_checkin(&self, trigger: TriggerReason) -> ActionOutcome {
        self.perform(AttendanceAction::Checkin, trigger).await
    }

    /// Checks out unless today's check-out already succeeded. The payload
    /// restates the recorded check-in time.
    pub async fn perform_checkout(&self, trigger: TriggerReason) -> ActionOutcome {
        self.perform(AttendanceAction::Checkout, trigger).await
    }

    /// Handles a location ping: records the sample, then checks in if the
    /// ping is inside the perimeter and inside the check-in window.
    ///
    /// # Arguments
    ///
    /// * `lat` - Latitude of the device in degrees.
    /// * `lng` - Longitude of the device in degrees.
    ///
    /// # Returns
    ///
    /// A `LocationReport` describing what happened.
    pub async fn handle_location_ping(&self, lat: f64, lng: f64) -> LocationReport {
        let reading = geofence::evaluate(lat, lng, &self.office);
        let now = self.clock.now();

        *self.location.lock() = LocationState {
            sample: Some(LocationSample {
                lat,
                lng,
                distance_meters: reading.distance_meters,
                within_perimeter: reading.within_perimeter,
                observed_at: now,
            }),
            confirmed: reading.within_perimeter,
        };

        self.activity.record(
            ActivityLevel::Info,
            format!(
                "Location received: {:.0}m from office, in perimeter: {}",
                reading.distance_meters, reading.within_perimeter
            ),
            Some(sonic_rs::json!({ "lat": lat, "lng": lng })),
        );

        if !reading.within_perimeter {
            return LocationReport::skipped(OUTSIDE_PERIMETER, reading.distance_meters);
        }

        let local_now = now.with_timezone(&self.schedule.timezone);
        if !is_within_checkin_window(&local_now, self.schedule.checkin_time) {
            return LocationReport::skipped(OUTSIDE_WINDOW, reading.distance_meters);
        }

        let outcome = self.perform_checkin(TriggerReason::Location).await;
        LocationReport::from_outcome(&outcome, reading.distance_meters)
    }

    /// Entry point of the daily check-in timer.
    ///
    /// With location confirmation required, proceeds only when the last ping
    /// was inside the perimeter and is no older than the staleness threshold.
    /// A skipped tick is logged and not retried.
    pub async fn run_scheduled_checkin(&self) -> ActionOutcome {
        self.activity.info(format!(
            "[CRON] Check-in triggered at {}",
            self.schedule.checkin_time.format("%H:%M")
        ));
        let now = self.clock.now();

        if self.features.require_location {
            let location = *self.location.lock();
            let age = location
                .sample
                .map(|sample| (now - sample.observed_at).to_std().unwrap_or_default());
            let fresh = location.confirmed && age.is_some_and(|age| age <= self.features.location_max_age);

            if !fresh {
                self.activity.warn(
                    "[CRON] Check-in skipped: no recent in-perimeter location ping",
                    Some(sonic_rs::json!({
                        "location_age_secs": age.map(|age| age.as_secs()),
                        "confirmed": location.confirmed,
                    })),
                );
                return ActionOutcome::Skipped(SkipReason::NoRecentLocation);
            }
        }

        if self.features.cron_checkin_window {
            let local_now = now.with_timezone(&self.schedule.timezone);
            if !is_within_checkin_window(&local_now, self.schedule.checkin_time) {
                self.activity.warn("[CRON] Check-in skipped: outside check-in window", None);
                return ActionOutcome::Skipped(SkipReason::OutsideWindow);
            }
        }

        self.perform_checkin(TriggerReason::Cron).await
    }

    /// Entry point of the daily check-out timer.
    pub async fn run_scheduled_checkout(&self) -> ActionOutcome {
        self.activity.info(format!(
            "[CRON] Check-out triggered at {}",
            self.schedule.checkout_time.format("%H:%M")
        ));
        self.perform_checkout(TriggerReason::Cron).await
    }

    /// Returns the current attendance, location and session state.
    pub fn snapshot(&self) -> AttendanceSnapshot {
        let record = self.book.lock().record;
        let location = *self.location.lock();

        AttendanceSnapshot {
            last_checkin: record.last_checkin_at,
            last_checkout: record.last_checkout_at,
            last_location: location.sample,
            location_confirmed: location.confirmed,
            in_perimeter: location.sample.is_some_and(|s| s.within_perimeter),
            distance_to_office: location.sample.map(|s| s.distance_meters.round()),
            session: self.sessions.status(),
        }
    }

    async fn perform(&self, action: AttendanceAction, trigger: TriggerReason) -> ActionOutcome {
        if let Err(e) = self.sessions.ensure_valid().await {
            self.activity.error(
                format!("{} aborted: could not establish session", action.label()),
                Some(sonic_rs::json!({ "message": e.to_string() })),
            );
            return ActionOutcome::Failed(FailureReason::AuthFailed);
        }

        let now = self.clock.now();
        let today = self.guard.local_date(now);
        let (_claim, checkin_at) = match self.claim(action, today) {
            Ok(claimed) => claimed,
            Err(skip) => {
                self.activity.warn(
                    format!("{} skipped: {}", action.label(), skip.code()),
                    None,
                );
                return ActionOutcome::Skipped(skip);
            }
        };

        let Some(auth) = self.sessions.build_auth_context() else {
            self.activity.error(
                format!("{} aborted: session was invalidated", action.label()),
                None,
            );
            return ActionOutcome::Failed(FailureReason::AuthFailed);
        };

        self.activity.info(format!(
            "Performing {} (triggered by: {})...",
            action, trigger
        ));

        let payload = match action {
            AttendanceAction::Checkin => AttendancePayload::checkin(self.shift.clone()),
            AttendanceAction::Checkout => AttendancePayload::checkout(self.shift.clone(), checkin_at, now),
        };

        match self.client.submit_attendance(&auth, &payload).await {
            Ok(response) => {
                let at = self.clock.now();
                self.book.lock().record.mark(action, at);
                self.activity.success(
                    format!("{} successful", action.label()),
                    Some(response.clone()),
                );
                ActionOutcome::Completed { at, response }
            }
            Err(e) => {
                self.activity.error(
                    format!("{} failed", action.label()),
                    Some(sonic_rs::json!({ "message": e.to_string() })),
                );
                ActionOutcome::Failed(FailureReason::Remote(e.to_string()))
            }
        }
    }

    /// Atomically checks the daily guard and the in-flight marker for
    /// `action` and claims it.
    ///
    /// # Returns
    ///
    /// The claim, released on drop, and the recorded check-in time; or why
    /// the action must not run now.
    fn claim(
        &self,
        action: AttendanceAction,
        today: NaiveDate,
    ) -> Result<(InFlight<'_>, Option<DateTime<Utc>>), SkipReason> {
        let mut book = self.book.lock();

        if self.guard.done_on(book.record.last(action), today) {
            return Err(SkipReason::AlreadyDone(action));
        }

        let in_flight = book.in_flight_mut(action);
        if *in_flight {
            return Err(SkipReason::InProgress(action));
        }
        *in_flight = true;

        let checkin_at = book.record.last_checkin_at;
        drop(book);

        Ok((
            InFlight {
                book: &self.book,
                action,
            },
            checkin_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockAttendanceApi;
    use crate::clock::ManualClock;
    use crate::config::{Credentials, RemoteApiConfig};
    use crate::services::geofence::EARTH_RADIUS_METERS;
    use chrono::{Duration, NaiveTime, TimeZone};
    use chrono_tz::Asia::Karachi;
    use zeroize::Zeroizing;

    const OFFICE_LAT: f64 = 24.8600;
    const OFFICE_LNG: f64 = 67.0300;

    fn test_config(features: FeatureFlags) -> Config {
        Config {
            credentials: Credentials {
                email: "me@acme.example".to_string(),
                password: Zeroizing::new("hunter22".to_string()),
            },
            api: RemoteApiConfig {
                login_url: "http://hr.invalid/login".to_string(),
                attendance_url: "http://hr.invalid/attendance".to_string(),
                subdomain: "acme".to_string(),
                version_code: "42".to_string(),
                version_no: "4.2.0".to_string(),
                shift: Some(sonic_rs::json!({ "id": 3, "name": "General" })),
                request_timeout: std::time::Duration::from_secs(5),
            },
            schedule: ScheduleConfig {
                checkin_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                checkout_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
                timezone: Karachi,
            },
            office: OfficeGeofence {
                lat: OFFICE_LAT,
                lng: OFFICE_LNG,
                radius_meters: 200.0,
            },
            features,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            static_dir: "public".to_string(),
        }
    }

    fn default_features() -> FeatureFlags {
        FeatureFlags {
            require_location: false,
            location_max_age: std::time::Duration::from_secs(30 * 60),
            cron_checkin_window: false,
        }
    }

    /// Monday 2025-03-03 at the given Karachi local time, in UTC.
    fn local(h: u32, m: u32) -> DateTime<Utc> {
        Karachi.with_ymd_and_hms(2025, 3, 3, h, m, 0).unwrap().with_timezone(&Utc)
    }

    struct Fixture {
        api: Arc<MockAttendanceApi>,
        clock: Arc<ManualClock>,
        orchestrator: Arc<AttendanceOrchestrator>,
    }

    fn fixture_with(features: FeatureFlags) -> Fixture {
        let api = Arc::new(MockAttendanceApi::new());
        let clock = Arc::new(ManualClock::new(local(9, 0)));
        let activity = ActivityLog::new(clock.clone());
        let orchestrator = Arc::new(AttendanceOrchestrator::new(
            &test_config(features),
            api.clone(),
            clock.clone(),
            activity,
        ));
        Fixture { api, clock, orchestrator }
    }

    fn fixture() -> Fixture {
        fixture_with(default_features())
    }

    #[tokio::test]
    async fn checkin_submits_at_most_once_per_day() {
        let f = fixture();

        let first = f.orchestrator.perform_checkin(TriggerReason::Manual).await;
        assert!(first.is_success());

        f.clock.advance(Duration::hours(2));
        let second = f.orchestrator.perform_checkin(TriggerReason::Location).await;
        assert!(matches!(
            second,
            ActionOutcome::Skipped(SkipReason::AlreadyDone(AttendanceAction::Checkin))
        ));

        assert_eq!(f.api.submission_count(), 1);
        assert_eq!(f.api.login_count(), 1);
        let (_, payload) = &f.api.submissions()[0];
        assert!(payload.mark_checkin);
        assert_eq!(f.orchestrator.snapshot().last_checkin, Some(local(9, 0)));
    }

    #[tokio::test]
    async fn a_new_local_day_allows_another_checkin() {
        let f = fixture();
        assert!(f.orchestrator.perform_checkin(TriggerReason::Cron).await.is_success());

        f.clock.advance(Duration::days(1));
        assert!(f.orchestrator.perform_checkin(TriggerReason::Cron).await.is_success());
        assert_eq!(f.api.submission_count(), 2);
    }

    #[tokio::test]
    async fn auth_failure_never_contacts_attendance_endpoint() {
        let f = fixture();
        f.api.reject_logins(true);

        let outcome = f.orchestrator.perform_checkin(TriggerReason::Manual).await;

        assert!(matches!(outcome, ActionOutcome::Failed(FailureReason::AuthFailed)));
        assert_eq!(outcome.report().reason.as_deref(), Some("auth_failed"));
        assert_eq!(f.api.submission_count(), 0);
        assert!(f.orchestrator.snapshot().last_checkin.is_none());
    }

    #[tokio::test]
    async fn remote_failure_leaves_action_retryable() {
        let f = fixture();
        f.api.fail_next_submissions(1);

        let failed = f.orchestrator.perform_checkin(TriggerReason::Cron).await;
        match &failed {
            ActionOutcome::Failed(FailureReason::Remote(detail)) => assert!(detail.contains("500")),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(f.orchestrator.snapshot().last_checkin.is_none());

        f.clock.advance(Duration::minutes(10));
        let retried = f.orchestrator.perform_checkin(TriggerReason::Manual).await;
        assert!(retried.is_success());
        assert_eq!(f.orchestrator.snapshot().last_checkin, Some(local(9, 10)));
    }

    #[tokio::test]
    async fn checkout_restates_recorded_checkin_time() {
        let f = fixture();
        f.orchestrator.perform_checkin(TriggerReason::Cron).await;

        f.clock.set(local(18, 0));
        let outcome = f.orchestrator.perform_checkout(TriggerReason::Cron).await;
        assert!(outcome.is_success());

        let (_, payload) = &f.api.submissions()[1];
        // 09:00 in Karachi is 04:00 UTC.
        assert_eq!(payload.checkin_time, "2025-03-03 04:00:00");
        assert!(payload.is_checkin_time);
        assert_eq!(payload.mark_checkout, Some(true));
        assert_eq!(f.orchestrator.snapshot().last_checkout, Some(local(18, 0)));
    }

    #[tokio::test]
    async fn checkout_without_checkin_uses_current_time() {
        let f = fixture();
        f.clock.set(local(18, 0));

        assert!(f.orchestrator.perform_checkout(TriggerReason::Manual).await.is_success());

        let (_, payload) = &f.api.submissions()[0];
        assert_eq!(payload.checkin_time, "2025-03-03 13:00:00");
    }

    #[tokio::test]
    async fn checkout_is_guarded_independently() {
        let f = fixture();
        f.clock.set(local(18, 0));
        assert!(f.orchestrator.perform_checkout(TriggerReason::Cron).await.is_success());

        let again = f.orchestrator.perform_checkout(TriggerReason::Manual).await;
        assert_eq!(again.report().reason.as_deref(), Some("already_checked_out"));

        assert!(f.orchestrator.perform_checkin(TriggerReason::Manual).await.is_success());
    }

    #[tokio::test]
    async fn ping_at_office_during_window_checks_in_once() {
        let f = fixture();

        let first = f.orchestrator.handle_location_ping(OFFICE_LAT, OFFICE_LNG).await;
        assert!(first.triggered);
        assert_eq!(first.action, Some(AttendanceAction::Checkin));
        assert_eq!(first.success, Some(true));
        assert_eq!(first.distance_meters, 0.0);

        f.clock.advance(Duration::minutes(5));
        let second = f.orchestrator.handle_location_ping(OFFICE_LAT, OFFICE_LNG).await;
        assert!(!second.triggered);
        assert_eq!(second.reason.as_deref(), Some("already_checked_in"));

        assert_eq!(f.api.submission_count(), 1);
    }

    #[tokio::test]
    async fn ping_500m_away_is_outside_perimeter() {
        let f = fixture();
        let lat = OFFICE_LAT + (500.0 / EARTH_RADIUS_METERS).to_degrees();

        let report = f.orchestrator.handle_location_ping(lat, OFFICE_LNG).await;

        assert!(!report.triggered);
        assert_eq!(report.reason.as_deref(), Some("outside perimeter"));
        assert_eq!(report.distance_meters, 500.0);
        assert_eq!(f.api.submission_count(), 0);
        assert_eq!(f.api.login_count(), 0);

        let snapshot = f.orchestrator.snapshot();
        assert!(!snapshot.location_confirmed);
        assert_eq!(snapshot.last_location.map(|s| s.lat), Some(lat));
    }

    #[tokio::test]
    async fn ping_inside_perimeter_outside_window_only_records_location() {
        let f = fixture();
        f.clock.set(local(12, 0));

        let report = f.orchestrator.handle_location_ping(OFFICE_LAT, OFFICE_LNG).await;

        assert!(!report.triggered);
        assert_eq!(report.reason.as_deref(), Some("outside window"));
        assert_eq!(f.api.submission_count(), 0);
        assert!(f.orchestrator.snapshot().location_confirmed);
        assert!(f.orchestrator.snapshot().in_perimeter);
    }

    #[tokio::test]
    async fn scheduled_checkin_without_location_requirement_always_attempts() {
        let f = fixture();
        f.clock.set(local(12, 0));

        assert!(f.orchestrator.run_scheduled_checkin().await.is_success());
    }

    #[tokio::test]
    async fn scheduled_checkin_requires_a_fresh_confirmed_ping() {
        let f = fixture_with(FeatureFlags {
            require_location: true,
            ..default_features()
        });

        let no_ping = f.orchestrator.run_scheduled_checkin().await;
        assert!(matches!(no_ping, ActionOutcome::Skipped(SkipReason::NoRecentLocation)));

        // 08:20 is before the window, so the ping itself does not check in.
        f.clock.set(local(8, 20));
        let ping = f.orchestrator.handle_location_ping(OFFICE_LAT, OFFICE_LNG).await;
        assert!(!ping.triggered);

        f.clock.set(local(8, 50));
        assert!(f.orchestrator.run_scheduled_checkin().await.is_success());
        assert_eq!(f.api.submission_count(), 1);
    }

    #[tokio::test]
    async fn scheduled_checkin_skips_stale_or_outside_pings() {
        let f = fixture_with(FeatureFlags {
            require_location: true,
            ..default_features()
        });

        f.clock.set(local(8, 20));
        f.orchestrator.handle_location_ping(OFFICE_LAT, OFFICE_LNG).await;

        // One second past the 30 minute threshold.
        f.clock.set(local(8, 50) + Duration::seconds(1));
        let stale = f.orchestrator.run_scheduled_checkin().await;
        assert_eq!(stale.report().reason.as_deref(), Some("no_recent_location"));

        f.orchestrator.handle_location_ping(OFFICE_LAT + 0.05, OFFICE_LNG).await;
        let outside = f.orchestrator.run_scheduled_checkin().await;
        assert!(matches!(outside, ActionOutcome::Skipped(SkipReason::NoRecentLocation)));

        assert_eq!(f.api.submission_count(), 0);

        // A ping aged exactly the threshold is still fresh. 10:10 is after the
        // window, so the ping itself does not check in.
        f.clock.set(local(10, 10));
        let ping = f.orchestrator.handle_location_ping(OFFICE_LAT, OFFICE_LNG).await;
        assert!(!ping.triggered);

        f.clock.set(local(10, 40));
        assert!(f.orchestrator.run_scheduled_checkin().await.is_success());
        assert_eq!(f.api.submission_count(), 1);
    }

    #[tokio::test]
    async fn scheduled_checkin_window_is_opt_in() {
        let f = fixture_with(FeatureFlags {
            cron_checkin_window: true,
            ..default_features()
        });
        f.clock.set(local(12, 0));

        let outcome = f.orchestrator.run_scheduled_checkin().await;
        assert!(matches!(outcome, ActionOutcome::Skipped(SkipReason::OutsideWindow)));

        f.clock.set(local(9, 0));
        assert!(f.orchestrator.run_scheduled_checkin().await.is_success());
    }

    #[tokio::test]
    async fn scheduled_checkout_runs_checkout() {
        let f = fixture();
        f.clock.set(local(18, 0));

        assert!(f.orchestrator.run_scheduled_checkout().await.is_success());
        assert_eq!(f.api.submissions()[0].1.mark_checkout, Some(true));
    }

    #[tokio::test]
    async fn concurrent_checkins_submit_once() {
        let f = fixture();
        f.api.set_latency(std::time::Duration::from_millis(50));

        let attempts = (0..6).map(|i| {
            let orchestrator = f.orchestrator.clone();
            let trigger = if i % 2 == 0 { TriggerReason::Manual } else { TriggerReason::Location };
            tokio::spawn(async move { orchestrator.perform_checkin(trigger).await })
        });
        let outcomes: Vec<ActionOutcome> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(outcomes.iter().filter(|o| o.is_success()).count(), 1);
        assert!(outcomes.iter().filter(|o| !o.is_success()).all(|o| matches!(
            o,
            ActionOutcome::Skipped(SkipReason::InProgress(_) | SkipReason::AlreadyDone(_))
        )));
        assert_eq!(f.api.submission_count(), 1);
        assert_eq!(f.api.login_count(), 1);
    }

    #[tokio::test]
    async fn in_flight_marker_is_released_after_failure() {
        let f = fixture();
        f.api.fail_next_submissions(1);

        assert!(!f.orchestrator.perform_checkin(TriggerReason::Cron).await.is_success());
        let retry = f.orchestrator.perform_checkin(TriggerReason::Manual).await;
        assert!(retry.is_success());
    }
}
