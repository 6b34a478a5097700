use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike};
use thiserror::Error;

/// Minutes before the nominal check-in time a location ping may check in.
pub const CHECKIN_WINDOW_BEFORE_MINUTES: i64 = 30;
/// Minutes after the nominal check-in time a location ping may check in.
pub const CHECKIN_WINDOW_AFTER_MINUTES: i64 = 60;

/// An error raised while reading a schedule time.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The input was not of the form `HH:MM`.
    #[error("expected HH:MM, got '{0}'")]
    Malformed(String),

    /// The hour or minute was out of range.
    #[error("time out of range: '{0}'")]
    OutOfRange(String),
}

/// Parses a 24-hour `HH:MM` time.
///
/// # Arguments
///
/// * `raw` - The text to parse, e.g. `"09:00"`.
///
/// # Returns
///
/// A `Result` containing the parsed `NaiveTime`.
pub fn parse_hhmm(raw: &str) -> Result<NaiveTime, ScheduleError> {
    let trimmed = raw.trim();
    let (hour, minute) = trimmed
        .split_once(':')
        .ok_or_else(|| ScheduleError::Malformed(trimmed.to_string()))?;

    let hour: u32 = hour
        .parse()
        .map_err(|_| ScheduleError::Malformed(trimmed.to_string()))?;
    let minute: u32 = minute
        .parse()
        .map_err(|_| ScheduleError::Malformed(trimmed.to_string()))?;

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| ScheduleError::OutOfRange(trimmed.to_string()))
}

/// Builds the weekday cron expression firing at `time`.
///
/// The expression uses the seconds-first six-field format understood by the
/// cron scheduler, restricted to Monday through Friday.
pub fn to_cron_expression(time: NaiveTime) -> String {
    format!("0 {} {} * * Mon-Fri", time.minute(), time.hour())
}

/// Checks whether `now` lies inside the check-in window around `nominal`.
///
/// The window is `[nominal - 30min, nominal + 60min]`, both ends inclusive,
/// anchored on the calendar day of `now` in its own timezone.
///
/// # Arguments
///
/// * `now` - The current instant, already in the configured timezone.
/// * `nominal` - The configured check-in time.
///
/// # Returns
///
/// `true` if a location-triggered check-in may proceed now.
pub fn is_within_checkin_window<Tz: TimeZone>(now: &DateTime<Tz>, nominal: NaiveTime) -> bool {
    let local = now.naive_local();
    let anchor = local.date().and_time(nominal);
    let start = anchor - Duration::minutes(CHECKIN_WINDOW_BEFORE_MINUTES);
    let end = anchor + Duration::minutes(CHECKIN_WINDOW_AFTER_MINUTES);

    local >= start && local <= end
}
