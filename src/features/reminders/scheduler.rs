//! # Feature: Reminder Scheduler
//!
//! Holds the fixed daily reminders and the user's one-shot custom reminders,
//! fires each occurrence exactly once, and bends the schedule around the
//! person's condition: critical reminders are pushed back and non-critical
//! ones skipped while at risk or inactive, then restored on recovery.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 2.0.0: Adaptive delay/skip/restore, occurrence-level fire tracking
//! - 1.1.0: Custom one-shot reminders
//! - 1.0.0: Fixed daily reminders

use crate::core::{CareResult, Clock, Language};
use crate::features::notifications::{AnnouncementRequest, NotificationDispatcher, Priority};
use crate::features::reminders::reminder::{
    next_occurrence, parse_reminder_time, Reminder, ReminderCategory, ReminderOrigin,
    ReminderState,
};
use crate::store::{ActivityLog, PersistenceStore};
use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const SUMMARY_ADJUSTED: &str = "Adjusting your schedule due to health or behavior. Please rest.";
pub const SUMMARY_RESTORED: &str = "Your health has improved. Schedule restored.";

/// Why the schedule is being adapted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdaptCause {
    HealthRisk,
    Inactivity,
}

impl fmt::Display for AdaptCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptCause::HealthRisk => write!(f, "health risk"),
            AdaptCause::Inactivity => write!(f, "unusual behavior"),
        }
    }
}

/// What one `adapt` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdaptOutcome {
    pub delayed: usize,
    pub skipped: usize,
    pub restored: usize,
}

pub struct ReminderScheduler {
    reminders: Mutex<Vec<Reminder>>,
    store: Arc<dyn PersistenceStore>,
    dispatcher: Arc<NotificationDispatcher>,
    activity_log: ActivityLog,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    /// Restore the persisted schedule, seeding `fixed` when none was saved.
    pub fn new(
        fixed: Vec<Reminder>,
        store: Arc<dyn PersistenceStore>,
        dispatcher: Arc<NotificationDispatcher>,
        activity_log: ActivityLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let mut reminders = store.load_schedule();
        let seeded = reminders.is_empty();
        if seeded {
            reminders = fixed;
        }
        let custom = store.load_custom_reminders();
        info!(
            "📅 Reminder schedule ready: {} fixed ({}), {} custom",
            reminders.len(),
            if seeded { "seeded" } else { "restored" },
            custom.len()
        );
        reminders.extend(custom);

        let scheduler = Self {
            reminders: Mutex::new(reminders),
            store,
            dispatcher,
            activity_log,
            clock,
        };
        if seeded {
            scheduler.persist(&scheduler.snapshot());
        }
        scheduler
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Reminder>> {
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current schedule, fixed reminders first
    pub fn snapshot(&self) -> Vec<Reminder> {
        self.lock().clone()
    }

    /// Adapt the schedule to the person's condition.
    ///
    /// With a cause, critical reminders are delayed to `now + delay_minutes`
    /// and non-critical ones skipped. Repeating the call only moves the
    /// delayed due time. Without a cause, elapsed delays and skips are
    /// restored to pending; delays still in the future are left alone.
    /// Spent one-shot reminders are never touched.
    pub fn adapt(&self, cause: Option<AdaptCause>, delay_minutes: i64) -> AdaptOutcome {
        let now = self.clock.now();
        let mut outcome = AdaptOutcome::default();
        let mut announcements = Vec::new();
        let mut log_lines = Vec::new();

        {
            let mut reminders = self.lock();
            match cause {
                Some(cause) => {
                    let due = now + Duration::minutes(delay_minutes);
                    for reminder in reminders.iter_mut().filter(|r| !r.is_spent()) {
                        let noun = reminder.noun();
                        if reminder.critical {
                            reminder.scheduled_at = Some(due);
                            reminder.state = ReminderState::Delayed;
                            outcome.delayed += 1;
                            log_lines.push(format!(
                                "Delaying {} '{}' due to {}",
                                noun, reminder.description, cause
                            ));
                            let message = match reminder.origin {
                                ReminderOrigin::Fixed => format!(
                                    "Delaying your task '{}'. Please rest for now.",
                                    reminder.description
                                ),
                                ReminderOrigin::Custom => format!(
                                    "Delaying your reminder '{}'. Please rest.",
                                    reminder.description
                                ),
                            };
                            announcements.push(AnnouncementRequest::new(
                                message,
                                reminder.language,
                                Priority::Low,
                            ));
                        } else {
                            reminder.scheduled_at = None;
                            reminder.state = ReminderState::Skipped;
                            outcome.skipped += 1;
                            log_lines.push(format!(
                                "Skipping {} '{}' due to {}",
                                noun, reminder.description, cause
                            ));
                            announcements.push(AnnouncementRequest::new(
                                format!("Skipping your {} '{}'. Please rest.", noun, reminder.description),
                                reminder.language,
                                Priority::Low,
                            ));
                        }
                    }
                    announcements.push(AnnouncementRequest::new(
                        SUMMARY_ADJUSTED,
                        Language::English,
                        Priority::Medium,
                    ));
                }
                None => {
                    for reminder in reminders.iter_mut().filter(|r| !r.is_spent()) {
                        let elapsed = reminder.scheduled_at.is_some_and(|at| at < now);
                        let restore = match reminder.state {
                            ReminderState::Skipped => true,
                            ReminderState::Delayed => elapsed,
                            // Fixed reminders without a daily time stay fired until recovery
                            ReminderState::Fired => reminder.time_of_day.is_none(),
                            ReminderState::Pending => elapsed,
                        };
                        if restore {
                            reminder.scheduled_at = None;
                            reminder.state = ReminderState::Pending;
                            outcome.restored += 1;
                            log_lines.push(format!(
                                "Restoring {} '{}'",
                                reminder.noun(),
                                reminder.description
                            ));
                        }
                    }
                    announcements.push(AnnouncementRequest::new(
                        SUMMARY_RESTORED,
                        Language::English,
                        Priority::Medium,
                    ));
                }
            }
            // Persist under the lock so a concurrent fire cannot be overwritten
            self.persist(&reminders);
        }

        for line in log_lines {
            self.activity_log.record(line);
        }
        for request in announcements {
            self.dispatcher.announce(request);
        }

        debug!("Schedule adapted ({cause:?}): {outcome:?}");
        outcome
    }

    /// Arm pending daily reminders that have no current occurrence.
    pub fn rearm(&self, now: NaiveDateTime) -> usize {
        let mut reminders = self.lock();
        let mut armed = 0;
        for reminder in reminders.iter_mut() {
            if reminder.state != ReminderState::Pending || reminder.scheduled_at.is_some() {
                continue;
            }
            if let Some(time_of_day) = reminder.time_of_day {
                reminder.scheduled_at = Some(next_occurrence(time_of_day, now));
                armed += 1;
            }
        }

        if armed > 0 {
            self.persist(&reminders);
        }
        armed
    }

    /// Fire every reminder whose current occurrence is due, at most once per
    /// occurrence. Returns the messages that were handed to the dispatcher.
    pub fn fire_due(&self, now: NaiveDateTime) -> Vec<String> {
        let due = {
            let mut reminders = self.lock();
            let mut due = Vec::new();
            for reminder in reminders.iter_mut().filter(|r| r.is_due(now)) {
                reminder.fired_occurrence = reminder.scheduled_at;
                reminder.state = ReminderState::Fired;

                let priority = if reminder.critical {
                    Priority::High
                } else {
                    Priority::Medium
                };
                due.push(AnnouncementRequest::new(
                    reminder.fire_message(),
                    reminder.language,
                    priority,
                ));

                // Daily reminders roll straight to their next occurrence
                if let Some(time_of_day) = reminder.time_of_day {
                    reminder.scheduled_at = Some(next_occurrence(time_of_day, now));
                    reminder.state = ReminderState::Pending;
                }
            }
            if !due.is_empty() {
                self.persist(&reminders);
            }
            due
        };

        due.into_iter()
            .map(|request| {
                let message = request.message.clone();
                self.activity_log.record(format!("Reminder: {message}"));
                self.dispatcher.announce(request);
                self.activity_log.record("User confirmed: Yes");
                message
            })
            .collect()
    }

    /// One timer tick: arm, then fire.
    pub fn tick(&self) -> Vec<String> {
        let now = self.clock.now();
        self.rearm(now);
        self.fire_due(now)
    }

    /// Add a one-shot reminder at an absolute `YYYY-MM-DD HH:MM` time
    pub fn add_custom_reminder(
        &self,
        at_time: &str,
        message: &str,
        category: ReminderCategory,
        critical: bool,
        language: Language,
    ) -> CareResult<Reminder> {
        let at = parse_reminder_time(at_time)?;
        let reminder = Reminder::custom(message.trim(), language, category, critical, at);

        {
            let mut reminders = self.lock();
            reminders.push(reminder.clone());
            self.persist(&reminders);
        }

        self.activity_log.record(format!(
            "Added custom reminder: {} at {}",
            reminder.description,
            at.format("%Y-%m-%d %H:%M")
        ));
        Ok(reminder)
    }

    /// Tick every `period` until the task is dropped
    pub async fn run(self: Arc<Self>, period: std::time::Duration) {
        info!("⏰ Reminder timer started (every {}s)", period.as_secs());
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let fired = self.tick();
            if !fired.is_empty() {
                debug!("Fired {} reminder(s)", fired.len());
            }
        }
    }

    /// Write the schedule through to the store. Callers hold the reminder lock.
    fn persist(&self, reminders: &[Reminder]) {
        let (fixed, custom): (Vec<Reminder>, Vec<Reminder>) = reminders
            .iter()
            .cloned()
            .partition(|r| r.origin == ReminderOrigin::Fixed);

        if let Err(e) = self.store.save_schedule(&fixed) {
            warn!("Failed to persist schedule: {e}");
        }
        if let Err(e) = self.store.save_custom_reminders(&custom) {
            warn!("Failed to persist custom reminders: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CareError, ManualClock};
    use crate::features::notifications::SilentRenderer;
    use crate::store::MemoryStore;
    use chrono::{NaiveDate, NaiveTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap()
    }

    struct Harness {
        scheduler: ReminderScheduler,
        dispatcher: Arc<NotificationDispatcher>,
        store: Arc<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness(fixed: Vec<Reminder>) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start()));
        let log = ActivityLog::new(store.clone(), clock.clone(), 500);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SilentRenderer),
            log.clone(),
            clock.clone(),
        ));
        let scheduler =
            ReminderScheduler::new(fixed, store.clone(), dispatcher.clone(), log, clock.clone());
        Harness {
            scheduler,
            dispatcher,
            store,
            clock,
        }
    }

    fn daily(description: &str, critical: bool, hour: u32) -> Reminder {
        Reminder::fixed(
            description,
            Language::English,
            ReminderCategory::Medicine,
            critical,
            NaiveTime::from_hms_opt(hour, 0, 0),
        )
    }

    fn find<'a>(reminders: &'a [Reminder], description: &str) -> &'a Reminder {
        reminders
            .iter()
            .find(|r| r.description == description)
            .unwrap()
    }

    #[tokio::test]
    async fn test_seeds_and_persists_fixed_schedule() {
        let h = harness(vec![daily("pills", true, 8), daily("walk", false, 17)]);
        assert_eq!(h.store.load_schedule().len(), 2);
        assert!(h.store.load_custom_reminders().is_empty());
        assert_eq!(h.scheduler.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_restores_persisted_schedule_instead_of_seeding() {
        let h = harness(vec![daily("pills", true, 8)]);
        let log = ActivityLog::new(h.store.clone(), h.clock.clone(), 500);
        let again = ReminderScheduler::new(
            vec![daily("other", true, 9)],
            h.store.clone(),
            h.dispatcher.clone(),
            log,
            h.clock.clone(),
        );
        let reminders = again.snapshot();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].description, "pills");
    }

    #[tokio::test]
    async fn test_adapt_delays_critical_and_skips_the_rest() {
        let h = harness(vec![daily("pills", true, 8), daily("walk", false, 17)]);

        let outcome = h.scheduler.adapt(Some(AdaptCause::HealthRisk), 60);
        assert_eq!(outcome, AdaptOutcome { delayed: 1, skipped: 1, restored: 0 });

        let reminders = h.scheduler.snapshot();
        let pills = find(&reminders, "pills");
        assert_eq!(pills.state, ReminderState::Delayed);
        assert_eq!(pills.scheduled_at, Some(start() + Duration::minutes(60)));
        let walk = find(&reminders, "walk");
        assert_eq!(walk.state, ReminderState::Skipped);
        assert_eq!(walk.scheduled_at, None);

        let lines: Vec<String> = h
            .store
            .recent_activity_records(10)
            .into_iter()
            .map(|r| r.activity)
            .collect();
        assert!(lines.contains(&"Delaying task 'pills' due to health risk".to_string()));
        assert!(lines.contains(&"Skipping task 'walk' due to health risk".to_string()));
    }

    #[tokio::test]
    async fn test_repeated_adapt_only_moves_due_time() {
        let h = harness(vec![daily("pills", true, 8), daily("walk", false, 17)]);
        h.scheduler.adapt(Some(AdaptCause::Inactivity), 60);
        h.clock.advance(Duration::minutes(5));
        h.scheduler.adapt(Some(AdaptCause::Inactivity), 60);

        let reminders = h.scheduler.snapshot();
        let pills = find(&reminders, "pills");
        assert_eq!(pills.state, ReminderState::Delayed);
        assert_eq!(pills.scheduled_at, Some(start() + Duration::minutes(65)));
        assert_eq!(find(&reminders, "walk").state, ReminderState::Skipped);
    }

    #[tokio::test]
    async fn test_recovery_restores_elapsed_and_skipped() {
        let h = harness(vec![daily("pills", true, 8), daily("walk", false, 17)]);
        h.scheduler.adapt(Some(AdaptCause::HealthRisk), 60);

        // Delay still in the future: only the skip is undone
        h.clock.advance(Duration::minutes(30));
        let outcome = h.scheduler.adapt(None, 60);
        assert_eq!(outcome.restored, 1);
        let reminders = h.scheduler.snapshot();
        assert_eq!(find(&reminders, "pills").state, ReminderState::Delayed);
        assert_eq!(find(&reminders, "walk").state, ReminderState::Pending);

        // Fire the delayed occurrence, then both re-arm to their daily time
        h.clock.advance(Duration::minutes(31));
        let fired = h.scheduler.tick();
        assert_eq!(fired, vec!["Time to take your medicine: pills".to_string()]);

        let reminders = h.scheduler.snapshot();
        let tomorrow = start().date().succ_opt().unwrap();
        assert_eq!(
            find(&reminders, "pills").scheduled_at,
            Some(tomorrow.and_hms_opt(8, 0, 0).unwrap())
        );
        assert_eq!(
            find(&reminders, "walk").scheduled_at,
            Some(start().date().and_hms_opt(17, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_custom_reminder_fires_exactly_once() {
        let h = harness(Vec::new());
        let mut rx = h.dispatcher.subscribe();

        h.scheduler
            .add_custom_reminder(
                "2025-01-01 09:00",
                "Take medicine",
                ReminderCategory::Medicine,
                true,
                Language::English,
            )
            .unwrap();
        assert_eq!(h.store.load_custom_reminders().len(), 1);
        assert!(!h.dispatcher.is_busy());

        h.clock.set(start().date().and_hms_opt(9, 0, 0).unwrap());
        let fired = h.scheduler.tick();
        assert_eq!(fired, vec!["Time to take your medicine: Take medicine".to_string()]);

        let announcement = rx.recv().await.unwrap();
        assert_eq!(announcement.request.message, "Time to take your medicine: Take medicine");
        assert_eq!(announcement.request.priority, Priority::High);
        h.dispatcher.wait_idle().await;

        h.clock.advance(Duration::minutes(1));
        assert!(h.scheduler.tick().is_empty());
        h.clock.advance(Duration::hours(5));
        assert!(h.scheduler.tick().is_empty());
        assert!(rx.try_recv().is_err());

        let custom = h.store.load_custom_reminders();
        assert_eq!(custom[0].state, ReminderState::Fired);

        let lines: Vec<String> = h
            .store
            .recent_activity_records(10)
            .into_iter()
            .map(|r| r.activity)
            .collect();
        assert!(lines.contains(&"Reminder: Time to take your medicine: Take medicine".to_string()));
        assert!(lines.contains(&"User confirmed: Yes".to_string()));
    }

    #[tokio::test]
    async fn test_spent_custom_reminder_not_adapted() {
        let h = harness(Vec::new());
        h.scheduler
            .add_custom_reminder(
                "2025-01-01 07:30",
                "Call family",
                ReminderCategory::Other,
                true,
                Language::English,
            )
            .unwrap();
        h.clock.advance(Duration::hours(1));
        assert_eq!(h.scheduler.tick().len(), 1);

        let outcome = h.scheduler.adapt(Some(AdaptCause::HealthRisk), 60);
        assert_eq!(outcome, AdaptOutcome::default());
        let outcome = h.scheduler.adapt(None, 60);
        assert_eq!(outcome.restored, 0);
        assert_eq!(h.scheduler.snapshot()[0].state, ReminderState::Fired);
    }

    #[tokio::test]
    async fn test_invalid_custom_time_is_rejected() {
        let h = harness(Vec::new());
        let result = h.scheduler.add_custom_reminder(
            "tomorrow at nine",
            "Take medicine",
            ReminderCategory::Medicine,
            true,
            Language::English,
        );
        assert_eq!(
            result,
            Err(CareError::InvalidReminderTime("tomorrow at nine".to_string()))
        );
        assert!(h.scheduler.snapshot().is_empty());
        assert!(h.store.load_custom_reminders().is_empty());
    }

    #[tokio::test]
    async fn test_daily_reminder_fires_once_per_day() {
        let h = harness(vec![daily("pills", true, 8)]);
        assert_eq!(h.scheduler.tick().len(), 0);

        h.clock.set(start().date().and_hms_opt(8, 0, 0).unwrap());
        assert_eq!(h.scheduler.tick().len(), 1);
        h.dispatcher.wait_idle().await;
        h.clock.advance(Duration::minutes(1));
        assert_eq!(h.scheduler.tick().len(), 0);

        h.clock.advance(Duration::days(1));
        assert_eq!(h.scheduler.tick().len(), 1);
    }

    #[tokio::test]
    async fn test_adding_reminder_leaves_dispatcher_free_for_its_fire() {
        let h = harness(Vec::new());
        let mut rx = h.dispatcher.subscribe();
        h.scheduler
            .add_custom_reminder(
                "2025-01-01 09:00",
                "Take medicine",
                ReminderCategory::Medicine,
                true,
                Language::English,
            )
            .unwrap();

        let at = start().date().and_hms_opt(9, 0, 0).unwrap();
        let fired = h.scheduler.fire_due(at);
        assert_eq!(fired, vec!["Time to take your medicine: Take medicine".to_string()]);

        let announcement = rx.try_recv().unwrap();
        assert_eq!(announcement.request.message, "Time to take your medicine: Take medicine");
        let stats = h.dispatcher.stats();
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 0);
    }

    #[tokio::test]
    async fn test_fire_due_twice_with_same_now() {
        let h = harness(vec![daily("pills", true, 8)]);
        h.scheduler
            .add_custom_reminder(
                "2025-01-01 08:00",
                "Call family",
                ReminderCategory::Other,
                false,
                Language::English,
            )
            .unwrap();

        let at = start().date().and_hms_opt(8, 0, 0).unwrap();
        h.scheduler.rearm(start());
        assert_eq!(h.scheduler.fire_due(at).len(), 2);
        assert!(h.scheduler.fire_due(at).is_empty());

        let reminders = h.scheduler.snapshot();
        assert_eq!(find(&reminders, "Call family").state, ReminderState::Fired);
        let pills = find(&reminders, "pills");
        assert_eq!(pills.state, ReminderState::Pending);
        assert_eq!(pills.fired_occurrence, Some(at));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_adapt_and_tick_persist_latest_state() {
        let h = harness(vec![daily("pills", true, 7), daily("walk", false, 17)]);
        for minute in 0..10 {
            h.scheduler
                .add_custom_reminder(
                    &format!("2025-01-01 07:{minute:02}"),
                    &format!("custom {minute}"),
                    ReminderCategory::Other,
                    minute % 2 == 0,
                    Language::English,
                )
                .unwrap();
        }
        h.clock.set(start() + Duration::minutes(30));

        let scheduler = Arc::new(h.scheduler);
        let adapter = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                for round in 0..200 {
                    let cause = (round % 2 == 0).then_some(AdaptCause::HealthRisk);
                    scheduler.adapt(cause, 0);
                }
            })
        };
        let ticker = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    scheduler.tick();
                }
            })
        };
        adapter.await.unwrap();
        ticker.await.unwrap();

        let (fixed, custom): (Vec<Reminder>, Vec<Reminder>) = scheduler
            .snapshot()
            .into_iter()
            .partition(|r| r.origin == ReminderOrigin::Fixed);
        assert_eq!(h.store.load_schedule(), fixed);
        assert_eq!(h.store.load_custom_reminders(), custom);
    }
}
