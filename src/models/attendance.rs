use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The two attendance actions performed each working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceAction {
    Checkin,
    Checkout,
}

impl AttendanceAction {
    /// The lowercase name used in responses and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceAction::Checkin => "checkin",
            AttendanceAction::Checkout => "checkout",
        }
    }

    /// Human-readable label for log messages.
    pub fn label(self) -> &'static str {
        match self {
            AttendanceAction::Checkin => "Check-in",
            AttendanceAction::Checkout => "Check-out",
        }
    }
}

impl fmt::Display for AttendanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an attendance attempt originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// The daily timer.
    Cron,
    /// A location ping inside the perimeter.
    Location,
    /// An explicit request.
    Manual,
}

impl TriggerReason {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerReason::Cron => "cron",
            TriggerReason::Location => "location",
            TriggerReason::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// When each action last succeeded.
///
/// Only written after the remote API confirmed a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub last_checkin_at: Option<DateTime<Utc>>,
    pub last_checkout_at: Option<DateTime<Utc>>,
}

impl AttendanceRecord {
    /// Returns when `action` last succeeded.
    pub fn last(&self, action: AttendanceAction) -> Option<DateTime<Utc>> {
        match action {
            AttendanceAction::Checkin => self.last_checkin_at,
            AttendanceAction::Checkout => self.last_checkout_at,
        }
    }

    /// Records a confirmed success of `action` at `at`.
    pub fn mark(&mut self, action: AttendanceAction, at: DateTime<Utc>) {
        match action {
            AttendanceAction::Checkin => self.last_checkin_at = Some(at),
            AttendanceAction::Checkout => self.last_checkout_at = Some(at),
        }
    }
}

/// Why an attempt was skipped without contacting the attendance endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The action already succeeded today.
    AlreadyDone(AttendanceAction),
    /// Another trigger is submitting the same action right now.
    InProgress(AttendanceAction),
    /// A scheduled check-in needed a fresh in-perimeter location ping.
    NoRecentLocation,
    /// A scheduled check-in fell outside the check-in window.
    OutsideWindow,
}

impl SkipReason {
    pub fn code(self) -> &'static str {
        match self {
            SkipReason::AlreadyDone(AttendanceAction::Checkin) => "already_checked_in",
            SkipReason::AlreadyDone(AttendanceAction::Checkout) => "already_checked_out",
            SkipReason::InProgress(AttendanceAction::Checkin) => "checkin_in_progress",
            SkipReason::InProgress(AttendanceAction::Checkout) => "checkout_in_progress",
            SkipReason::NoRecentLocation => "no_recent_location",
            SkipReason::OutsideWindow => "outside_window",
        }
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// No usable session could be established.
    AuthFailed,
    /// The attendance submission itself failed.
    Remote(String),
}

impl FailureReason {
    pub fn code(&self) -> &str {
        match self {
            FailureReason::AuthFailed => "auth_failed",
            FailureReason::Remote(detail) => detail,
        }
    }
}

/// The result of one check-in or check-out attempt.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// The remote API accepted the submission.
    Completed {
        at: DateTime<Utc>,
        response: sonic_rs::Value,
    },
    /// Nothing was submitted.
    Skipped(SkipReason),
    /// A submission was attempted and did not succeed; the action stays
    /// eligible for a later trigger today.
    Failed(FailureReason),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Completed { .. })
    }

    /// Flattens the outcome into its wire representation.
    pub fn report(&self) -> ActionReport {
        match self {
            ActionOutcome::Completed { at, response } => ActionReport {
                success: true,
                time: Some(*at),
                reason: None,
                data: Some(response.clone()),
            },
            ActionOutcome::Skipped(skip) => ActionReport {
                success: false,
                time: None,
                reason: Some(skip.code().to_string()),
                data: None,
            },
            ActionOutcome::Failed(failure) => ActionReport {
                success: false,
                time: None,
                reason: Some(failure.code().to_string()),
                data: None,
            },
        }
    }
}

/// The JSON body returned for a check-in or check-out attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<sonic_rs::Value>,
}
