use chrono::{DateTime, Utc};
use serde::Serialize;

/// Format the remote API expects for `checkin_time`: second precision, no offset.
pub const CHECKIN_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CATALOG_TIMESTAMP: &str = "2020-06-09 12:52:50";

/// One entry of the remote API's break catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakType {
    pub id: u32,
    pub name: &'static str,
    pub start: String,
    pub end: String,
    pub description: Option<String>,
    pub created_at: &'static str,
    pub updated_at: &'static str,
    pub deleted_at: Option<String>,
    pub icon: Option<String>,
    pub start_color: Option<String>,
    pub end_color: Option<String>,
}

impl BreakType {
    fn named(id: u32, name: &'static str) -> Self {
        Self {
            id,
            name,
            start: format!("{name} Out"),
            end: format!("{name} In"),
            description: None,
            created_at: CATALOG_TIMESTAMP,
            updated_at: CATALOG_TIMESTAMP,
            deleted_at: None,
            icon: None,
            start_color: None,
            end_color: None,
        }
    }
}

/// The static break catalog sent with every submission.
pub fn break_catalog() -> Vec<BreakType> {
    [
        "Default",
        "Personal",
        "Tea/Smoking",
        "Official Work",
        "Lunch",
        "Prayer",
        "Other",
    ]
    .into_iter()
    .zip(1..)
    .map(|(name, id)| BreakType::named(id, name))
    .collect()
}

/// The JSON document delivered in the `mark_attendance` form field.
#[derive(Debug, Clone, Serialize)]
pub struct AttendancePayload {
    pub breaks: Vec<BreakType>,
    pub is_checkin_time: bool,
    pub checkin_time: String,
    pub checkin_address: String,
    pub is_checkout_time: bool,
    pub checkout_time: String,
    pub checkout_address: String,
    pub break_id: Option<u32>,
    pub is_break: bool,
    pub break_time: String,
    pub use_location_for_mark_attendance: bool,
    pub is_pic_required: bool,
    pub is_mark_attendance_allowed: bool,
    pub shift: Option<sonic_rs::Value>,
    pub geo_fences: Vec<sonic_rs::Value>,
    pub mark_checkin: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_checkout: Option<bool>,
}

impl AttendancePayload {
    fn base(shift: Option<sonic_rs::Value>) -> Self {
        Self {
            breaks: break_catalog(),
            is_checkin_time: false,
            checkin_time: String::new(),
            checkin_address: String::new(),
            is_checkout_time: false,
            checkout_time: String::new(),
            checkout_address: String::new(),
            break_id: None,
            is_break: false,
            break_time: String::new(),
            use_location_for_mark_attendance: false,
            is_pic_required: false,
            is_mark_attendance_allowed: true,
            shift,
            geo_fences: Vec::new(),
            mark_checkin: false,
            mark_checkout: None,
        }
    }

    /// Builds a check-in submission.
    pub fn checkin(shift: Option<sonic_rs::Value>) -> Self {
        Self {
            mark_checkin: true,
            ..Self::base(shift)
        }
    }

    /// Builds a check-out submission restating the day's check-in time.
    ///
    /// # Arguments
    ///
    /// * `shift` - The configured shift descriptor.
    /// * `checkin_at` - When check-in was recorded; `fallback` is used if never.
    /// * `fallback` - The current time.
    pub fn checkout(
        shift: Option<sonic_rs::Value>,
        checkin_at: Option<DateTime<Utc>>,
        fallback: DateTime<Utc>,
    ) -> Self {
        Self {
            is_checkin_time: true,
            checkin_time: checkin_at.unwrap_or(fallback).format(CHECKIN_TIME_FORMAT).to_string(),
            mark_checkout: Some(true),
            ..Self::base(shift)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sonic_rs::JsonValueTrait;

    #[test]
    fn catalog_has_seven_numbered_breaks() {
        let catalog = break_catalog();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog[0].id, 1);
        assert_eq!(catalog[2].start, "Tea/Smoking Out");
        assert_eq!(catalog[6].end, "Other In");
    }

    #[test]
    fn checkin_payload_marks_checkin_only() {
        let payload = AttendancePayload::checkin(None);
        let json = sonic_rs::to_string(&payload).unwrap();
        let value: sonic_rs::Value = sonic_rs::from_str(&json).unwrap();

        assert_eq!(value["mark_checkin"].as_bool(), Some(true));
        assert_eq!(value["is_mark_attendance_allowed"].as_bool(), Some(true));
        assert!(value.get("mark_checkout").is_none());
        assert!(value["shift"].is_null());
    }

    #[test]
    fn checkout_payload_echoes_checkin_time_without_offset() {
        let checkin = Utc.with_ymd_and_hms(2025, 3, 3, 4, 1, 9).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 13, 0, 0).unwrap();
        let payload = AttendancePayload::checkout(Some(sonic_rs::json!({"id": 3})), Some(checkin), now);

        assert_eq!(payload.checkin_time, "2025-03-03 04:01:09");
        assert!(payload.is_checkin_time);
        assert_eq!(payload.mark_checkout, Some(true));
        assert!(!payload.mark_checkin);
    }

    #[test]
    fn checkout_without_checkin_falls_back_to_now() {
        let now = Utc.with_ymd_and_hms(2025, 3, 3, 13, 0, 0).unwrap();
        let payload = AttendancePayload::checkout(None, None, now);
        assert_eq!(payload.checkin_time, "2025-03-03 13:00:00");
    }
}
