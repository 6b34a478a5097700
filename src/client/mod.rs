//! Outbound access to the remote HR API.
//!
//! The attendance core only talks to [`AttendanceApi`]; `ResourceInnClient`
//! is the production implementation and `MockAttendanceApi` backs tests.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{payload::AttendancePayload, session::AuthContext};

pub mod mock;
pub mod resourceinn;

pub use mock::MockAttendanceApi;
pub use resourceinn::ResourceInnClient;

/// An error raised by the remote API client.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The client could not be built from its configuration.
    #[error("client configuration: {0}")]
    Config(String),
}

/// What a login exchange hands back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginGrant {
    /// The bearer credential, if the response carried one.
    pub access_token: Option<String>,
    /// `name=value` pairs from `Set-Cookie`, joined with `"; "`.
    pub cookie_header: Option<String>,
}

/// The remote HR API as seen by the attendance core.
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    /// Exchanges credentials for a bearer credential and cookies.
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError>;

    /// Submits an attendance payload and returns the remote response body.
    async fn submit_attendance(
        &self,
        auth: &AuthContext,
        payload: &AttendancePayload,
    ) -> Result<sonic_rs::Value, ApiError>;
}
