use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::clock::Clock;

/// How many entries the log keeps.
pub const ACTIVITY_LOG_CAPACITY: usize = 100;

/// Severity of an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Success,
    Warn,
    Error,
}

/// One entry of the activity log.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub time: DateTime<Utc>,
    pub level: ActivityLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<sonic_rs::Value>,
}

/// Bounded, newest-first record of what the service did.
///
/// Every entry is also emitted through `tracing`.
#[derive(Clone)]
pub struct ActivityLog {
    entries: Arc<Mutex<VecDeque<ActivityEntry>>>,
    clock: Arc<dyn Clock>,
}

impl ActivityLog {
    /// Creates a new, empty `ActivityLog`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(ACTIVITY_LOG_CAPACITY))),
            clock,
        }
    }

    /// Appends an entry, evicting the oldest one when full.
    ///
    /// # Arguments
    ///
    /// * `level` - The severity.
    /// * `message` - What happened.
    /// * `data` - Optional structured detail.
    pub fn record(&self, level: ActivityLevel, message: impl Into<String>, data: Option<sonic_rs::Value>) {
        let message = message.into();
        let rendered = data
            .as_ref()
            .and_then(|d| sonic_rs::to_string(d).ok())
            .unwrap_or_default();

        match level {
            ActivityLevel::Info => tracing::info!("{} {}", message, rendered),
            ActivityLevel::Success => tracing::info!("✅ {} {}", message, rendered),
            ActivityLevel::Warn => tracing::warn!("⚠️ {} {}", message, rendered),
            ActivityLevel::Error => tracing::error!("❌ {} {}", message, rendered),
        }

        let entry = ActivityEntry {
            time: self.clock.now(),
            level,
            message,
            data,
        };

        let mut entries = self.entries.lock();
        entries.push_front(entry);
        entries.truncate(ACTIVITY_LOG_CAPACITY);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(ActivityLevel::Info, message, None);
    }

    pub fn success(&self, message: impl Into<String>, data: Option<sonic_rs::Value>) {
        self.record(ActivityLevel::Success, message, data);
    }

    pub fn warn(&self, message: impl Into<String>, data: Option<sonic_rs::Value>) {
        self.record(ActivityLevel::Warn, message, data);
    }

    pub fn error(&self, message: impl Into<String>, data: Option<sonic_rs::Value>) {
        self.record(ActivityLevel::Error, message, data);
    }

    /// Returns up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ActivityEntry> {
        self.entries.lock().iter().take(limit).cloned().collect()
    }
}
