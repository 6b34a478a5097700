use async_trait::async_trait;
use reqwest::{
    Client, Response,
    header::{self, HeaderMap, HeaderName, HeaderValue},
    multipart,
};
use serde::Deserialize;

use crate::{
    client::{ApiError, AttendanceApi, LoginGrant},
    config::RemoteApiConfig,
    models::{payload::AttendancePayload, session::AuthContext},
};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/145.0.0.0 Safari/537.36";
const SEC_CH_UA: &str = r#""Not:A-Brand";v="99", "Chromium";v="145""#;

/// Name of the multipart field carrying the attendance JSON.
const ATTENDANCE_FIELD: &str = "mark_attendance";

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(default)]
    access_token: Option<String>,
}

/// reqwest-backed client for the ResourceInn HR API.
#[derive(Clone)]
pub struct ResourceInnClient {
    http: Client,
    login_url: String,
    attendance_url: String,
}

impl ResourceInnClient {
    /// Creates a new `ResourceInnClient`.
    ///
    /// # Arguments
    ///
    /// * `config` - Endpoint URLs, tenant and version headers.
    ///
    /// # Returns
    ///
    /// A `Result` containing the client.
    pub fn new(config: &RemoteApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .default_headers(common_headers(config)?)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            login_url: config.login_url.clone(),
            attendance_url: config.attendance_url.clone(),
        })
    }
}

/// Builds the browser-like headers the remote API expects on every call.
fn common_headers(config: &RemoteApiConfig) -> Result<HeaderMap, ApiError> {
    let origin = format!("https://{}.resourceinn.com", config.subdomain);
    let pairs = [
        ("accept", "application/json, text/plain, */*".to_string()),
        ("accept-language", "en-US,en;q=0.9".to_string()),
        ("origin", origin.clone()),
        ("priority", "u=1, i".to_string()),
        ("referer", format!("{origin}/")),
        ("sec-ch-ua", SEC_CH_UA.to_string()),
        ("sec-ch-ua-mobile", "?0".to_string()),
        ("sec-fetch-dest", "empty".to_string()),
        ("sec-fetch-mode", "cors".to_string()),
        ("sec-fetch-site", "same-origin".to_string()),
        ("user-agent", USER_AGENT.to_string()),
        ("version-code", config.version_code.clone()),
        ("version-no", config.version_no.clone()),
        ("x-subdomain", config.subdomain.clone()),
    ];

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        let value = HeaderValue::from_str(&value)
            .map_err(|e| ApiError::Config(format!("invalid {name} header: {e}")))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}

/// Reduces every `Set-Cookie` header to its `name=value` pair.
fn collect_cookies(headers: &HeaderMap) -> Option<String> {
    let pairs: Vec<&str> = headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect();

    if pairs.is_empty() {
        None
    } else {
        Some(pairs.join("; "))
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl AttendanceApi for ResourceInnClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, ApiError> {
        tracing::debug!("🔐 Posting login exchange to {}", self.login_url);

        let response = self
            .http
            .post(&self.login_url)
            .form(&[("email", email), ("password", password)])
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let cookie_header = collect_cookies(response.headers());
        let body = response.bytes().await?;
        let parsed: LoginResponse =
            sonic_rs::from_slice(&body).map_err(|e| ApiError::Decode(format!("login body: {e}")))?;

        Ok(LoginGrant {
            access_token: parsed
                .data
                .and_then(|data| data.access_token)
                .filter(|token| !token.is_empty()),
            cookie_header,
        })
    }

    async fn submit_attendance(
        &self,
        auth: &AuthContext,
        payload: &AttendancePayload,
    ) -> Result<sonic_rs::Value, ApiError> {
        let document = sonic_rs::to_string(payload)
            .map_err(|e| ApiError::Decode(format!("attendance payload: {e}")))?;
        let form = multipart::Form::new().text(ATTENDANCE_FIELD, document);

        let mut request = self
            .http
            .post(&self.attendance_url)
            .header(header::AUTHORIZATION, auth.credential.as_str())
            .multipart(form);
        if let Some(cookie) = &auth.cookie_header {
            request = request.header(header::COOKIE, cookie.as_str());
        }

        let response = ensure_success(request.send().await?).await?;
        let status = response.status();
        let body = response.bytes().await?;
        tracing::debug!("📨 Attendance endpoint answered {} ({} bytes)", status, body.len());

        match sonic_rs::from_slice::<sonic_rs::Value>(&body) {
            Ok(value) => Ok(value),
            Err(_) => sonic_rs::to_value(&String::from_utf8_lossy(&body).into_owned())
                .map_err(|e| ApiError::Decode(format!("attendance body: {e}"))),
        }
    }
}
