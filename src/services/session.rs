use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use chrono::Duration;
use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    client::{ApiError, AttendanceApi},
    clock::Clock,
    config::Credentials,
    models::session::{AuthContext, Session, SessionStatus},
    services::activity::ActivityLog,
};

/// How long a credential from the remote API stays usable.
pub const SESSION_VALIDITY_DAYS: i64 = 6;
/// How long before expiry a session is refreshed.
pub const REFRESH_LEAD_MINUTES: i64 = 5;

/// An error raised while establishing a session.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The login exchange itself failed.
    #[error("login exchange failed: {0}")]
    Exchange(#[from] ApiError),

    /// The login exchange returned no usable credential.
    #[error("login response carried no access token")]
    MissingCredential,

    /// A login attempt this call queued behind failed.
    #[error("concurrent login attempt failed: {0}")]
    Concurrent(String),
}

/// Owns the lifecycle of the remote API session.
///
/// Session data sits behind a synchronous lock that is never held across a
/// network call. Logins are serialized by an async gate. A caller that had to
/// wait for the gate adopts the outcome of the attempt it waited on, so
/// concurrent refreshes collapse into a single login exchange whether it
/// succeeds or fails.
pub struct SessionManager {
    client: Arc<dyn AttendanceApi>,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    activity: ActivityLog,
    session: RwLock<Option<Session>>,
    /// Guards the failure text of the most recent login attempt.
    login_gate: Mutex<Option<String>>,
    /// Number of finished login attempts.
    attempts: AtomicU64,
    validity: Duration,
    refresh_lead: Duration,
}

impl SessionManager {
    /// Creates a new `SessionManager` with no session.
    ///
    /// # Arguments
    ///
    /// * `client` - The remote API client used for login exchanges.
    /// * `credentials` - The account to log in with.
    /// * `clock` - The time source for expiry checks.
    /// * `activity` - Where login outcomes are recorded.
    pub fn new(
        client: Arc<dyn AttendanceApi>,
        credentials: Credentials,
        clock: Arc<dyn Clock>,
        activity: ActivityLog,
    ) -> Self {
        Self {
            client,
            credentials,
            clock,
            activity,
            session: RwLock::new(None),
            login_gate: Mutex::new(None),
            attempts: AtomicU64::new(0),
            validity: Duration::days(SESSION_VALIDITY_DAYS),
            refresh_lead: Duration::minutes(REFRESH_LEAD_MINUTES),
        }
    }

    /// Makes sure a usable session exists, logging in if there is none or
    /// the current one is within the refresh lead of its expiry.
    ///
    /// # Returns
    ///
    /// `Ok(())` once a session is usable, or the `AuthError` of the single
    /// login attempt made by this call or by the attempt it waited on.
    pub async fn ensure_valid(&self) -> Result<(), AuthError> {
        if !self.needs_refresh() {
            return Ok(());
        }

        let seen = self.attempts.load(Ordering::SeqCst);
        let mut last_failure = self.login_gate.lock().await;
        if !self.needs_refresh() {
            tracing::debug!("🔑 Session refreshed by a concurrent caller");
            return Ok(());
        }

        if self.attempts.load(Ordering::SeqCst) != seen {
            if let Some(reason) = last_failure.as_ref() {
                tracing::debug!("🔑 Reusing failed outcome of a concurrent login");
                return Err(AuthError::Concurrent(reason.clone()));
            }
        }

        self.login_locked(&mut last_failure).await
    }

    /// Performs a login exchange unconditionally.
    pub async fn login(&self) -> Result<(), AuthError> {
        let mut last_failure = self.login_gate.lock().await;
        self.login_locked(&mut last_failure).await
    }

    /// Projects the current session into request headers. Never performs
    /// network activity.
    pub fn build_auth_context(&self) -> Option<AuthContext> {
        self.session.read().as_ref().map(Session::auth_context)
    }

    /// Drops the current session.
    pub fn invalidate(&self) {
        *self.session.write() = None;
    }

    pub fn status(&self) -> SessionStatus {
        let session = self.session.read();
        SessionStatus {
            has_session: session.is_some(),
            session_expiry: session.as_ref().map(|s| s.expires_at),
        }
    }

    fn needs_refresh(&self) -> bool {
        let now = self.clock.now();
        match self.session.read().as_ref() {
            None => true,
            Some(session) => session.is_expiring(now, self.refresh_lead),
        }
    }

    /// Runs one login exchange and records its outcome in the gate.
    async fn login_locked(&self, last_failure: &mut Option<String>) -> Result<(), AuthError> {
        let result = self.exchange().await;
        *last_failure = result.as_ref().err().map(ToString::to_string);
        self.attempts.fetch_add(1, Ordering::SeqCst);
        result
    }

    async fn exchange(&self) -> Result<(), AuthError> {
        self.activity.info("Attempting login...");

        let result = self
            .client
            .login(&self.credentials.email, self.credentials.password.as_str())
            .await;

        let grant = match result {
            Ok(grant) => grant,
            Err(e) => {
                self.invalidate();
                self.activity.error(
                    "Login failed",
                    Some(sonic_rs::json!({ "message": e.to_string() })),
                );
                return Err(AuthError::Exchange(e));
            }
        };

        let Some(credential) = grant.access_token.filter(|token| !token.is_empty()) else {
            self.invalidate();
            self.activity.error(
                "Login failed",
                Some(sonic_rs::json!({ "message": "No access_token in login response" })),
            );
            return Err(AuthError::MissingCredential);
        };

        let has_cookies = grant.cookie_header.is_some();
        let session = Session {
            credential,
            cookie_header: grant.cookie_header,
            expires_at: self.clock.now() + self.validity,
        };
        *self.session.write() = Some(session);

        self.activity.success(
            "Login successful",
            Some(sonic_rs::json!({ "has_token": true, "has_cookies": has_cookies })),
        );
        Ok(())
    }
}
