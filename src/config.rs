use std::{
    env,
    fmt,
    net::{IpAddr, SocketAddr},
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use zeroize::Zeroizing;

use crate::services::schedule::parse_hhmm;

/// Default timeout applied to every request against the remote HR API.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Login credentials for the remote HR API.
#[derive(Clone)]
pub struct Credentials {
    /// The account e-mail.
    pub email: String,
    /// The account password, wiped from memory on drop.
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The circular perimeter around the office.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OfficeGeofence {
    /// Latitude of the office point in degrees.
    pub lat: f64,
    /// Longitude of the office point in degrees.
    pub lng: f64,
    /// Perimeter radius in meters.
    pub radius_meters: f64,
}

/// Daily trigger times, interpreted in `timezone`.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    /// Nominal check-in time.
    pub checkin_time: NaiveTime,
    /// Nominal check-out time.
    pub checkout_time: NaiveTime,
    /// The timezone calendar days and trigger times are evaluated in.
    pub timezone: Tz,
}

/// Optional behaviour of the scheduled triggers.
#[derive(Debug, Clone, Copy)]
pub struct FeatureFlags {
    /// Scheduled check-in requires a recent in-perimeter location ping.
    pub require_location: bool,
    /// How old the last location ping may be for a scheduled check-in.
    pub location_max_age: Duration,
    /// Scheduled check-in must also fall inside the check-in window.
    pub cron_checkin_window: bool,
}

/// Endpoint and header details of the remote HR API.
#[derive(Debug, Clone)]
pub struct RemoteApiConfig {
    /// Login exchange URL.
    pub login_url: String,
    /// Attendance submission URL.
    pub attendance_url: String,
    /// Tenant subdomain, used for the origin/referer and `x-subdomain` headers.
    pub subdomain: String,
    /// Value of the `version-code` header.
    pub version_code: String,
    /// Value of the `version-no` header.
    pub version_no: String,
    /// Shift descriptor echoed verbatim in every attendance payload.
    pub shift: Option<sonic_rs::Value>,
    /// Request timeout.
    pub request_timeout: Duration,
}

/// The application's configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote login credentials.
    pub credentials: Credentials,
    /// Remote API details.
    pub api: RemoteApiConfig,
    /// Check-in/check-out schedule.
    pub schedule: ScheduleConfig,
    /// Office perimeter.
    pub office: OfficeGeofence,
    /// Scheduled trigger behaviour.
    pub features: FeatureFlags,
    /// The address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Directory served for requests no route matches.
    pub static_dir: String,
}

#[derive(Debug, Deserialize)]
struct UserConfigFile {
    urls: UserConfigUrls,
    subdomain: String,
    headers: UserConfigHeaders,
    #[serde(default)]
    shift: Option<sonic_rs::Value>,
}

#[derive(Debug, Deserialize)]
struct UserConfigUrls {
    login: String,
    attendance: String,
}

#[derive(Debug, Deserialize)]
struct UserConfigHeaders {
    #[serde(rename = "version-code")]
    version_code: String,
    #[serde(rename = "version-no")]
    version_no: String,
}

impl Config {
    /// Creates a new `Config` from environment variables and the user config
    /// file named by `USER_CONFIG_PATH`.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let path = env::var("USER_CONFIG_PATH").unwrap_or_else(|_| "./config.json".to_string());
        let user_config = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read user config at {path} (copy config.example.json)"))?;

        Self::from_source(|key| env::var(key).ok(), &user_config)
    }

    /// Builds a `Config` from a variable lookup and the user config JSON.
    ///
    /// # Arguments
    ///
    /// * `lookup` - Resolves a variable name to its value, if set.
    /// * `user_config` - The contents of the user config file.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_source<F>(lookup: F, user_config: &str) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let file: UserConfigFile =
            sonic_rs::from_str(user_config).context("User config must be valid JSON with urls, subdomain and headers")?;

        let checkin_time = parse_hhmm(&var("CHECKIN_TIME", "09:00")).context("Invalid CHECKIN_TIME")?;
        let checkout_time = parse_hhmm(&var("CHECKOUT_TIME", "18:00")).context("Invalid CHECKOUT_TIME")?;

        let tz_name = var("TZ", "Asia/Karachi");
        let timezone: Tz = tz_name
            .parse()
            .map_err(|e| anyhow!("Invalid TZ '{}': {}", tz_name, e))?;

        let office = OfficeGeofence {
            lat: parse_f64(&var("OFFICE_LAT", "0.0"), "OFFICE_LAT")?,
            lng: parse_f64(&var("OFFICE_LNG", "0.0"), "OFFICE_LNG")?,
            radius_meters: parse_f64(&var("OFFICE_RADIUS", "200"), "OFFICE_RADIUS")?,
        };
        if office.radius_meters < 0.0 {
            anyhow::bail!("OFFICE_RADIUS must not be negative");
        }

        let location_timeout_ms: u64 = var("LOCATION_TIMEOUT_MS", "300000")
            .parse()
            .context("Invalid LOCATION_TIMEOUT_MS")?;

        let host: IpAddr = var("HOST", "0.0.0.0").parse().context("Invalid HOST")?;
        let port: u16 = var("PORT", "3000").parse().context("Invalid PORT")?;

        Ok(Self {
            credentials: Credentials {
                email: var("RI_EMAIL", ""),
                password: Zeroizing::new(var("RI_PASSWORD", "")),
            },
            api: RemoteApiConfig {
                login_url: file.urls.login,
                attendance_url: file.urls.attendance,
                subdomain: file.subdomain,
                version_code: file.headers.version_code,
                version_no: file.headers.version_no,
                shift: file.shift,
                request_timeout: DEFAULT_REQUEST_TIMEOUT,
            },
            schedule: ScheduleConfig {
                checkin_time,
                checkout_time,
                timezone,
            },
            office,
            features: FeatureFlags {
                require_location: var("REQUIRE_LOCATION", "false") == "true",
                location_max_age: Duration::from_millis(location_timeout_ms),
                cron_checkin_window: var("CRON_CHECKIN_WINDOW", "false") == "true",
            },
            bind_addr: SocketAddr::new(host, port),
            static_dir: var("STATIC_DIR", "public"),
        })
    }
}

fn parse_f64(raw: &str, key: &str) -> Result<f64> {
    let value: f64 = raw.trim().parse().with_context(|| format!("Invalid {key}"))?;
    if !value.is_finite() {
        anyhow::bail!("{key} must be a finite number");
    }
    Ok(value)
}
