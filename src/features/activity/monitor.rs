//! # Feature: Activity Monitoring
//!
//! Tracks the last observed activity and the last detected fall. Inactivity is
//! a pure function of elapsed time; fall detection is a probability hook that
//! stands in for a real sensor.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

use crate::core::RandomSource;
use chrono::{Duration, NaiveDateTime};
use log::{debug, warn};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default inactivity threshold (30 minutes)
pub const DEFAULT_INACTIVITY_SECS: i64 = 1800;

/// Default chance of a simulated fall per check
pub const DEFAULT_FALL_PROBABILITY: f64 = 0.1;

#[derive(Debug)]
struct ActivityState {
    last_activity: NaiveDateTime,
    last_fall: Option<NaiveDateTime>,
}

#[derive(Debug)]
pub struct ActivityMonitor {
    state: Mutex<ActivityState>,
    inactivity_threshold: Duration,
    fall_probability: f64,
}

impl ActivityMonitor {
    pub fn new(started_at: NaiveDateTime, inactivity_threshold: Duration, fall_probability: f64) -> Self {
        Self {
            state: Mutex::new(ActivityState {
                last_activity: started_at,
                last_fall: None,
            }),
            inactivity_threshold,
            fall_probability: fall_probability.clamp(0.0, 1.0),
        }
    }

    fn state(&self) -> MutexGuard<'_, ActivityState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Note activity at `timestamp`. Older timestamps never move the marker back.
    pub fn record_activity(&self, timestamp: NaiveDateTime) {
        let mut state = self.state();
        if timestamp > state.last_activity {
            state.last_activity = timestamp;
        }
    }

    pub fn last_activity(&self) -> NaiveDateTime {
        self.state().last_activity
    }

    pub fn last_fall(&self) -> Option<NaiveDateTime> {
        self.state().last_fall
    }

    /// Whether the person has been inactive longer than the threshold, and for how long.
    pub fn check_inactivity(&self, now: NaiveDateTime) -> (bool, Duration) {
        let elapsed = now - self.state().last_activity;
        // Clock skew: a reading from before the last activity counts as "just active"
        let elapsed = elapsed.max(Duration::zero());
        let inactive = elapsed > self.inactivity_threshold;

        if inactive {
            debug!("Inactive for {}s", elapsed.num_seconds());
        }
        (inactive, elapsed)
    }

    /// Roll the fall-detection hook; a fall is remembered with its timestamp.
    pub fn check_fall(&self, random: &mut dyn RandomSource, now: NaiveDateTime) -> bool {
        let fallen = random.next_unit() < self.fall_probability;
        if fallen {
            warn!("Fall detected at {now}");
            self.state().last_fall = Some(now);
        }
        fallen
    }
}
