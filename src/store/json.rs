//! JSON file store.
//!
//! Each log is a single JSON array rewritten on every append. Unreadable or
//! corrupt files are treated as empty, matching the "in-memory state is
//! authoritative" rule for the current process.

use crate::core::{CareError, CareResult};
use crate::features::reminders::Reminder;
use crate::store::{tail, ActivityRecord, HealthRecord, PersistenceStore};
use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const HEALTH_LOG_FILE: &str = "health_log.json";
pub const ACTIVITY_LOG_FILE: &str = "activity_log.json";
pub const SCHEDULE_FILE: &str = "schedule.json";
pub const CUSTOM_REMINDERS_FILE: &str = "custom_reminders.json";

pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles across producers
    io_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory and empty logs
    pub fn open(dir: impl Into<PathBuf>) -> CareResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            CareError::PersistenceFailure(format!("cannot create {}: {e}", dir.display()))
        })?;

        for name in [
            HEALTH_LOG_FILE,
            ACTIVITY_LOG_FILE,
            SCHEDULE_FILE,
            CUSTOM_REMINDERS_FILE,
        ] {
            let path = dir.join(name);
            if !path.exists() {
                fs::write(&path, "[]").map_err(|e| {
                    CareError::PersistenceFailure(format!("cannot create {}: {e}", path.display()))
                })?;
                debug!("Initialized {}", path.display());
            }
        }

        Ok(Self {
            dir,
            io_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_list<T: DeserializeOwned>(&self, name: &str) -> Vec<T> {
        let path = self.dir.join(name);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read {}: {e} - treating as empty", path.display());
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(items) => items,
            Err(e) => {
                warn!("Corrupt {}: {e} - treating as empty", path.display());
                Vec::new()
            }
        }
    }

    fn write_list<T: Serialize>(&self, name: &str, items: &[T]) -> CareResult<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(items).map_err(|e| {
            CareError::PersistenceFailure(format!("cannot encode {}: {e}", path.display()))
        })?;
        fs::write(&path, json).map_err(|e| {
            CareError::PersistenceFailure(format!("cannot write {}: {e}", path.display()))
        })
    }
}

impl PersistenceStore for JsonFileStore {
    fn append_health_record(&self, entry: &HealthRecord) -> CareResult<()> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<HealthRecord> = self.read_list(HEALTH_LOG_FILE);
        records.push(entry.clone());
        self.write_list(HEALTH_LOG_FILE, &records)
    }

    fn append_activity_record(&self, entry: &ActivityRecord, keep_last: usize) -> CareResult<()> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<ActivityRecord> = self.read_list(ACTIVITY_LOG_FILE);
        records.push(entry.clone());
        self.write_list(ACTIVITY_LOG_FILE, &tail(&records, keep_last))
    }

    fn recent_health_records(&self, limit: usize) -> Vec<HealthRecord> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        tail(&self.read_list::<HealthRecord>(HEALTH_LOG_FILE), limit)
    }

    fn recent_activity_records(&self, limit: usize) -> Vec<ActivityRecord> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        tail(&self.read_list::<ActivityRecord>(ACTIVITY_LOG_FILE), limit)
    }

    fn load_schedule(&self) -> Vec<Reminder> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_list(SCHEDULE_FILE)
    }

    fn save_schedule(&self, reminders: &[Reminder]) -> CareResult<()> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_list(SCHEDULE_FILE, reminders)
    }

    fn load_custom_reminders(&self) -> Vec<Reminder> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_list(CUSTOM_REMINDERS_FILE)
    }

    fn save_custom_reminders(&self, reminders: &[Reminder]) -> CareResult<()> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_list(CUSTOM_REMINDERS_FILE, reminders)
    }

    fn trim_activity_log(&self, cutoff: NaiveDateTime) -> CareResult<usize> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<ActivityRecord> = self.read_list(ACTIVITY_LOG_FILE);
        let before = records.len();
        records.retain(|entry| entry.timestamp >= cutoff);
        let removed = before - records.len();
        if removed > 0 {
            self.write_list(ACTIVITY_LOG_FILE, &records)?;
        }
        Ok(removed)
    }
}
