//! In-memory store with the same truncation semantics as the JSON files.

use crate::core::{CareError, CareResult};
use crate::features::reminders::Reminder;
use crate::store::{tail, ActivityRecord, HealthRecord, PersistenceStore};
use chrono::NaiveDateTime;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct MemoryState {
    health: Vec<HealthRecord>,
    activity: Vec<ActivityRecord>,
    schedule: Vec<Reminder>,
    custom: Vec<Reminder>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with `PersistenceFailure`
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> CareResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CareError::PersistenceFailure(
                "memory store is read-only".to_string(),
            ));
        }
        Ok(())
    }
}

impl PersistenceStore for MemoryStore {
    fn append_health_record(&self, entry: &HealthRecord) -> CareResult<()> {
        self.check_writable()?;
        self.state().health.push(entry.clone());
        Ok(())
    }

    fn append_activity_record(&self, entry: &ActivityRecord, keep_last: usize) -> CareResult<()> {
        self.check_writable()?;
        let mut state = self.state();
        state.activity.push(entry.clone());
        let kept = tail(&state.activity, keep_last);
        state.activity = kept;
        Ok(())
    }

    fn recent_health_records(&self, limit: usize) -> Vec<HealthRecord> {
        tail(&self.state().health, limit)
    }

    fn recent_activity_records(&self, limit: usize) -> Vec<ActivityRecord> {
        tail(&self.state().activity, limit)
    }

    fn load_schedule(&self) -> Vec<Reminder> {
        self.state().schedule.clone()
    }

    fn save_schedule(&self, reminders: &[Reminder]) -> CareResult<()> {
        self.check_writable()?;
        self.state().schedule = reminders.to_vec();
        Ok(())
    }

    fn load_custom_reminders(&self) -> Vec<Reminder> {
        self.state().custom.clone()
    }

    fn save_custom_reminders(&self, reminders: &[Reminder]) -> CareResult<()> {
        self.check_writable()?;
        self.state().custom = reminders.to_vec();
        Ok(())
    }

    fn trim_activity_log(&self, cutoff: NaiveDateTime) -> CareResult<usize> {
        self.check_writable()?;
        let mut state = self.state();
        let before = state.activity.len();
        state.activity.retain(|entry| entry.timestamp >= cutoff);
        Ok(before - state.activity.len())
    }
}
