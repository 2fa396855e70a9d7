//! # Reminders Feature
//!
//! Daily and one-shot reminders that adapt to the person's condition.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod reminder;
pub mod scheduler;

pub use reminder::{
    next_occurrence, parse_reminder_time, Reminder, ReminderCategory, ReminderOrigin,
    ReminderState,
};
pub use scheduler::{AdaptCause, AdaptOutcome, ReminderScheduler};
