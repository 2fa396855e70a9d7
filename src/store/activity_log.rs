//! Activity Log helper: a clock-stamped, failure-tolerant writer over the store.

use crate::core::Clock;
use crate::store::{ActivityRecord, PersistenceStore};
use log::{info, warn};
use std::sync::Arc;

#[derive(Clone)]
pub struct ActivityLog {
    store: Arc<dyn PersistenceStore>,
    clock: Arc<dyn Clock>,
    keep_last: usize,
}

impl ActivityLog {
    pub fn new(store: Arc<dyn PersistenceStore>, clock: Arc<dyn Clock>, keep_last: usize) -> Self {
        Self {
            store,
            clock,
            keep_last,
        }
    }

    /// Record an activity line. Store failures are logged and swallowed.
    pub fn record(&self, activity: impl Into<String>) {
        let entry = ActivityRecord {
            timestamp: self.clock.now(),
            activity: activity.into(),
        };
        info!("Activity: {}", entry.activity);

        if let Err(e) = self.store.append_activity_record(&entry, self.keep_last) {
            warn!("Failed to record activity '{}': {e}", entry.activity);
        }
    }

    pub fn recent(&self, limit: usize) -> Vec<ActivityRecord> {
        self.store.recent_activity_records(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    #[test]
    fn test_record_stamps_and_truncates() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let store = Arc::new(MemoryStore::new());
        let log = ActivityLog::new(store.clone(), Arc::new(ManualClock::new(start)), 2);

        log.record("first");
        log.record("second");
        log.record("third");

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].activity, "second");
        assert_eq!(recent[1].activity, "third");
        assert_eq!(recent[1].timestamp, start);
    }

    #[test]
    fn test_record_survives_store_failure() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let log = ActivityLog::new(store.clone(), Arc::new(ManualClock::new(start)), 5);

        log.record("lost line");
        assert!(log.recent(5).is_empty());
    }
}
