//! # Store Module
//!
//! Persistence collaborator for the care engine: health and activity logs plus
//! the fixed schedule and custom reminders. Writes are fallible; reads degrade to
//! an empty list so a corrupt or missing file never stops the engine.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Activity log trimming by age
//! - 1.0.0: JSON file and in-memory stores

pub mod activity_log;
pub mod json;
pub mod memory;

pub use activity_log::ActivityLog;
pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::core::CareResult;
use crate::features::reminders::Reminder;
use crate::features::vitals::{VitalsSnapshot, VitalsSource};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One line of the health log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub timestamp: NaiveDateTime,
    pub heart_rate: Option<u32>,
    /// `systolic/diastolic`
    pub blood_pressure: Option<String>,
    pub glucose: Option<u32>,
    /// Set for non-vitals events such as a detected fall
    pub event: Option<String>,
    pub source: Option<VitalsSource>,
}

impl HealthRecord {
    pub fn from_snapshot(snapshot: &VitalsSnapshot) -> Self {
        Self {
            timestamp: snapshot.recorded_at,
            heart_rate: Some(snapshot.heart_rate),
            blood_pressure: Some(format!("{}/{}", snapshot.systolic, snapshot.diastolic)),
            glucose: Some(snapshot.glucose),
            event: None,
            source: Some(snapshot.source),
        }
    }

    /// Event line that carries the latest vitals (if any) for context
    pub fn event(
        timestamp: NaiveDateTime,
        event: &str,
        latest: Option<&VitalsSnapshot>,
    ) -> Self {
        let mut record = latest.map(Self::from_snapshot).unwrap_or(Self {
            timestamp,
            heart_rate: None,
            blood_pressure: None,
            glucose: None,
            event: None,
            source: None,
        });
        record.timestamp = timestamp;
        record.event = Some(event.to_string());
        record.source = None;
        record
    }
}

/// One line of the activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: NaiveDateTime,
    pub activity: String,
}

/// Storage backend used by every component
pub trait PersistenceStore: Send + Sync {
    fn append_health_record(&self, entry: &HealthRecord) -> CareResult<()>;

    /// Append and truncate the log to the most recent `keep_last` entries
    fn append_activity_record(&self, entry: &ActivityRecord, keep_last: usize) -> CareResult<()>;

    fn recent_health_records(&self, limit: usize) -> Vec<HealthRecord>;

    fn recent_activity_records(&self, limit: usize) -> Vec<ActivityRecord>;

    fn load_schedule(&self) -> Vec<Reminder>;

    fn save_schedule(&self, reminders: &[Reminder]) -> CareResult<()>;

    fn load_custom_reminders(&self) -> Vec<Reminder>;

    fn save_custom_reminders(&self, reminders: &[Reminder]) -> CareResult<()>;

    /// Drop activity records older than `cutoff`, returning how many were removed
    fn trim_activity_log(&self, cutoff: NaiveDateTime) -> CareResult<usize>;
}

/// Last `limit` items of a slice, oldest first
pub(crate) fn tail<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    let start = items.len().saturating_sub(limit);
    items[start..].to_vec()
}
