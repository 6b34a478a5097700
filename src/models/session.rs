use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// An authenticated context against the remote HR API.
///
/// Owned by the session manager. A session only exists with a non-empty
/// credential and an expiry in the future at the time it was created.
#[derive(Debug, Clone)]
pub struct Session {
    /// The bearer credential sent as the `authorization` header.
    pub credential: String,
    /// Cookies returned by the login exchange, as a `cookie` header value.
    pub cookie_header: Option<String>,
    /// When the credential stops being usable.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Checks whether the session is within `lead` of its expiry at `now`.
    pub fn is_expiring(&self, now: DateTime<Utc>, lead: Duration) -> bool {
        now >= self.expires_at - lead
    }

    /// Projects the headers needed to authorize an outbound call.
    pub fn auth_context(&self) -> AuthContext {
        AuthContext {
            credential: self.credential.clone(),
            cookie_header: self.cookie_header.clone(),
        }
    }
}

/// The read-only projection of a session used to authorize requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub credential: String,
    pub cookie_header: Option<String>,
}

/// What the status endpoint reveals about the session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub has_session: bool,
    pub session_expiry: Option<DateTime<Utc>>,
}
