use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Per-calendar-day idempotency check for attendance actions.
///
/// Days are compared as calendar dates in the configured timezone, never as
/// elapsed durations, so an action at 23:50 and another at 00:10 fall on
/// different days.
#[derive(Debug, Clone, Copy)]
pub struct DailyActionGuard {
    timezone: Tz,
}

impl DailyActionGuard {
    /// Creates a new `DailyActionGuard` for `timezone`.
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    /// Returns the calendar date of `instant` in the configured timezone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// Checks whether an action last performed at `last_action_at` already
    /// happened on the same local day as `now`.
    ///
    /// # Arguments
    ///
    /// * `last_action_at` - When the action last succeeded, if ever.
    /// * `now` - The current instant.
    ///
    /// # Returns
    ///
    /// `true` if the action must not be repeated today.
    pub fn already_done_today(&self, last_action_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        self.done_on(last_action_at, self.local_date(now))
    }

    /// Same as [`already_done_today`](Self::already_done_today) with the
    /// local date of "now" computed once by the caller.
    pub fn done_on(&self, last_action_at: Option<DateTime<Utc>>, today: NaiveDate) -> bool {
        last_action_at.is_some_and(|last| self.local_date(last) == today)
    }
}
