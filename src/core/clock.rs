//! Injectable time and probability sources.
//!
//! Production code reads the local wall clock and the thread RNG; tests swap in
//! [`ManualClock`] and [`FixedRandom`] so due-time comparisons and fall detection
//! are deterministic.

use chrono::{Duration, Local, NaiveDateTime};
use rand::Rng;
use std::sync::{Mutex, PoisonError};

/// Source of "now" as a local, timezone-free timestamp
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Uniform probability source in `[0, 1)`
pub trait RandomSource: Send {
    fn next_unit(&mut self) -> f64;

    /// Pick an index in `0..len` (returns 0 for an empty range)
    fn pick(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_unit() * len as f64) as usize).min(len - 1)
    }
}

/// Thread-local RNG from `rand`
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Always returns the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(at(9, 0));
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), at(10, 30));

        clock.set(at(8, 0));
        assert_eq!(clock.now(), at(8, 0));
    }

    #[test]
    fn test_pick_stays_in_range() {
        assert_eq!(FixedRandom(0.0).pick(3), 0);
        assert_eq!(FixedRandom(0.5).pick(3), 1);
        assert_eq!(FixedRandom(0.999).pick(3), 2);
        assert_eq!(FixedRandom(0.7).pick(0), 0);
    }

    #[test]
    fn test_thread_random_unit_interval() {
        let mut rng = ThreadRandom;
        for _ in 0..100 {
            let v = rng.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
