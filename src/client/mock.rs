//! In-memory stand-in for the remote HR API.

use std::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    client::{ApiError, AttendanceApi, LoginGrant},
    models::{payload::AttendancePayload, session::AuthContext},
};

/// Credential handed out by a successful mock login.
pub const MOCK_TOKEN: &str = "mock-access-token";
/// Cookie header handed out by a successful mock login.
pub const MOCK_COOKIE: &str = "ri_session=mock";

/// Scriptable fake of [`AttendanceApi`] that counts every call.
#[derive(Debug, Default)]
pub struct MockAttendanceApi {
    logins: AtomicUsize,
    reject_logins: AtomicBool,
    omit_token: AtomicBool,
    failing_submissions: AtomicUsize,
    latency: Mutex<Option<Duration>>,
    submissions: Mutex<Vec<(AuthContext, AttendancePayload)>>,
}

impl MockAttendanceApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every login fail with HTTP 401 (or succeed again).
    pub fn reject_logins(&self, reject: bool) {
        self.reject_logins.store(reject, Ordering::SeqCst);
    }

    /// Makes logins succeed without carrying an access token.
    pub fn omit_token(&self, omit: bool) {
        self.omit_token.store(omit, Ordering::SeqCst);
    }

    /// Makes the next `count` submissions fail with HTTP 500.
    pub fn fail_next_submissions(&self, count: usize) {
        self.failing_submissions.store(count, Ordering::SeqCst);
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().len()
    }

    /// Every accepted submission in arrival order.
    pub fn submissions(&self) -> Vec<(AuthContext, AttendancePayload)> {
        self.submissions.lock().clone()
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AttendanceApi for MockAttendanceApi {
    async fn login(&self, _email: &str, _password: &str) -> Result<LoginGrant, ApiError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.reject_logins.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 401,
                body: "invalid credentials".to_string(),
            });
        }

        if self.omit_token.load(Ordering::SeqCst) {
            return Ok(LoginGrant::default());
        }

        Ok(LoginGrant {
            access_token: Some(MOCK_TOKEN.to_string()),
            cookie_header: Some(MOCK_COOKIE.to_string()),
        })
    }

    async fn submit_attendance(
        &self,
        auth: &AuthContext,
        payload: &AttendancePayload,
    ) -> Result<sonic_rs::Value, ApiError> {
        self.simulate_latency().await;

        let failed = self
            .failing_submissions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(ApiError::Status {
                status: 500,
                body: "attendance service unavailable".to_string(),
            });
        }

        self.submissions.lock().push((auth.clone(), payload.clone()));
        Ok(sonic_rs::json!({ "status": true, "message": "Attendance marked" }))
    }
}
