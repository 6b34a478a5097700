use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::attendance::{ActionOutcome, AttendanceAction};

/// Reason reported when a ping lands outside the office perimeter.
pub const OUTSIDE_PERIMETER: &str = "outside perimeter";
/// Reason reported when a ping is inside the perimeter but outside the
/// check-in window.
pub const OUTSIDE_WINDOW: &str = "outside window";

/// The most recent location ping. Each ping replaces the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationSample {
    pub lat: f64,
    pub lng: f64,
    pub distance_meters: f64,
    pub within_perimeter: bool,
    pub observed_at: DateTime<Utc>,
}

/// The JSON body returned for a location ping.
#[derive(Debug, Clone, Serialize)]
pub struct LocationReport {
    /// Whether a check-in submission was attempted.
    pub triggered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<AttendanceAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Distance to the office, rounded to whole meters.
    pub distance_meters: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<sonic_rs::Value>,
}

impl LocationReport {
    /// A ping that did not lead to a check-in attempt.
    pub fn skipped(reason: &str, distance_meters: f64) -> Self {
        Self {
            triggered: false,
            action: None,
            reason: Some(reason.to_string()),
            distance_meters: distance_meters.round(),
            success: None,
            time: None,
            data: None,
        }
    }

    /// A ping that reached the check-in path.
    ///
    /// Guard skips (already checked in, check-in in flight) count as not
    /// triggered; completed and failed submissions count as triggered.
    pub fn from_outcome(outcome: &ActionOutcome, distance_meters: f64) -> Self {
        if let ActionOutcome::Skipped(skip) = outcome {
            return Self::skipped(skip.code(), distance_meters);
        }

        let report = outcome.report();
        Self {
            triggered: true,
            action: Some(AttendanceAction::Checkin),
            reason: report.reason,
            distance_meters: distance_meters.round(),
            success: Some(report.success),
            time: report.time,
            data: report.data,
        }
    }
}
