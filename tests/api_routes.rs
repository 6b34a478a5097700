use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{NaiveTime, TimeZone, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use zeroize::Zeroizing;

use autopunch::{
    client::MockAttendanceApi,
    clock::ManualClock,
    config::{Config, Credentials, FeatureFlags, OfficeGeofence, RemoteApiConfig, ScheduleConfig},
    router::router,
    state::AppState,
};

const OFFICE_LAT: f64 = 24.8600;
const OFFICE_LNG: f64 = 67.0300;

// Shared test context
struct TestContext {
    app: Router,
    api: Arc<MockAttendanceApi>,
    clock: Arc<ManualClock>,
}

impl TestContext {
    fn new() -> Self {
        let api = Arc::new(MockAttendanceApi::new());
        // Monday 09:00 in Karachi.
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 3, 3, 4, 0, 0).unwrap()));
        let state = AppState::with_client(&test_config(), api.clone(), clock.clone());

        Self {
            app: router(state).unwrap(),
            api,
            clock,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::post(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.post_raw(uri, body.to_string()).await
    }

    async fn post_raw(&self, uri: &str, body: String) -> (StatusCode, Value) {
        let request = Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}

fn test_config() -> Config {
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
            shift: None,
            request_timeout: Duration::from_secs(5),
        },
        schedule: ScheduleConfig {
            checkin_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            checkout_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            timezone: chrono_tz::Asia::Karachi,
        },
        office: OfficeGeofence {
            lat: OFFICE_LAT,
            lng: OFFICE_LNG,
            radius_meters: 200.0,
        },
        features: FeatureFlags {
            require_location: false,
            location_max_age: Duration::from_secs(300),
            cron_checkin_window: false,
        },
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        static_dir: "public".to_string(),
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let context = TestContext::new();

    let (status, body) = context.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["time"], "2025-03-03T04:00:00Z");
}

#[tokio::test]
async fn invalid_location_pings_are_rejected() {
    let context = TestContext::new();

    let (status, body) = context
        .post_json("/api/location-ping", json!({ "lat": 24.86 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = context
        .post_json("/api/location-ping", json!({ "lat": 91.0, "lng": 67.03 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = context
        .post_raw("/api/location-ping", r#"{"lat": "north", "lng": 67.03}"#.to_string())
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert_eq!(context.api.submission_count(), 0);
}

#[tokio::test]
async fn ping_at_office_checks_in_once() {
    let context = TestContext::new();

    // Step 1: first ping inside the perimeter during the window
    let (status, body) = context
        .post_json("/api/location-ping", json!({ "lat": OFFICE_LAT, "lng": OFFICE_LNG }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triggered"], true);
    assert_eq!(body["action"], "checkin");
    assert_eq!(body["success"], true);
    assert_eq!(body["distance_meters"], 0.0);

    // Step 2: a later ping the same day is guarded
    context.clock.advance(chrono::Duration::minutes(3));
    let (_, body) = context
        .post_json("/api/location-ping", json!({ "lat": OFFICE_LAT, "lng": OFFICE_LNG }))
        .await;
    assert_eq!(body["triggered"], false);
    assert_eq!(body["reason"], "already_checked_in");

    assert_eq!(context.api.submission_count(), 1);
}

#[tokio::test]
async fn string_coordinates_are_parsed() {
    let context = TestContext::new();

    let body = format!(r#"{{"lat": "{OFFICE_LAT}", "lng": "{OFFICE_LNG}"}}"#);
    let (status, body) = context.post_raw("/api/location-ping", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triggered"], true);
    assert_eq!(body["action"], "checkin");
    assert_eq!(context.api.submission_count(), 1);
}

#[tokio::test]
async fn distant_ping_reports_outside_perimeter() {
    let context = TestContext::new();

    let (status, body) = context
        .post_json("/api/location-ping", json!({ "lat": OFFICE_LAT + 0.01, "lng": OFFICE_LNG }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["triggered"], false);
    assert_eq!(body["reason"], "outside perimeter");
    assert!(body["distance_meters"].as_f64().unwrap() > 1000.0);
    assert_eq!(context.api.login_count(), 0);
}

#[tokio::test]
async fn manual_actions_and_status() {
    let context = TestContext::new();

    // Step 1: manual check-in
    let (status, body) = context.post("/api/manual/checkin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["time"], "2025-03-03T04:00:00Z");

    // Step 2: a second manual check-in is guarded
    let (_, body) = context.post("/api/manual/checkin").await;
    assert_eq!(body["success"], false);
    assert_eq!(body["reason"], "already_checked_in");

    // Step 3: manual check-out in the evening
    context.clock.advance(chrono::Duration::hours(9));
    let (_, body) = context.post("/api/manual/checkout").await;
    assert_eq!(body["success"], true);

    let submissions = context.api.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[1].1.checkin_time, "2025-03-03 04:00:00");

    // Step 4: status reflects everything
    let (status, body) = context.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["last_checkin"], "2025-03-03T04:00:00Z");
    assert_eq!(body["last_checkout"], "2025-03-03T13:00:00Z");
    assert_eq!(body["has_session"], true);
    assert_eq!(body["location_confirmed"], false);
    assert_eq!(body["config"]["checkin_time"], "09:00");
    assert_eq!(body["config"]["timezone"], "Asia/Karachi");
    assert_eq!(body["config"]["office_radius"], 200.0);

    let log = body["log"].as_array().unwrap();
    assert!(!log.is_empty() && log.len() <= 20);
    assert_eq!(log[0]["level"], "success");
}

#[tokio::test]
async fn manual_login_reports_failure_reason() {
    let context = TestContext::new();

    let (_, body) = context.post("/api/manual/login").await;
    assert_eq!(body["success"], true);
    assert!(body.get("reason").is_none());

    context.api.reject_logins(true);
    let (_, body) = context.post("/api/manual/login").await;
    assert_eq!(body["success"], false);
    assert!(body["reason"].as_str().unwrap().contains("401"));

    let (_, body) = context.get("/api/status").await;
    assert_eq!(body["has_session"], false);
}

#[tokio::test]
async fn manual_routes_are_rate_limited() {
    let context = TestContext::new();

    let mut limited = false;
    for _ in 0..20 {
        let (status, _) = context.post("/api/manual/checkin").await;
        if status == StatusCode::TOO_MANY_REQUESTS {
            limited = true;
            break;
        }
    }

    assert!(limited);
    assert_eq!(context.api.submission_count(), 1);
}
