//! Reminder model and time helpers.

use crate::core::{CareError, CareResult, Language};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Formats accepted for a custom reminder's absolute due time
pub const REMINDER_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderCategory {
    Medicine,
    Doctor,
    #[default]
    Other,
}

impl ReminderCategory {
    /// Parse a free-form label; anything unrecognised is `Other`
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "medicine" | "medication" => ReminderCategory::Medicine,
            "doctor" => ReminderCategory::Doctor,
            _ => ReminderCategory::Other,
        }
    }

    /// Lead-in spoken before the reminder text
    pub fn message(&self) -> &'static str {
        match self {
            ReminderCategory::Medicine => "Time to take your medicine",
            ReminderCategory::Doctor => "Time to visit the doctor",
            ReminderCategory::Other => "Time for your activity",
        }
    }
}

impl fmt::Display for ReminderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReminderCategory::Medicine => write!(f, "medicine"),
            ReminderCategory::Doctor => write!(f, "doctor"),
            ReminderCategory::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderState {
    Pending,
    Delayed,
    Skipped,
    Fired,
}

/// Seeded at startup, or added at runtime with an absolute time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderOrigin {
    Fixed,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub description: String,
    pub language: Language,
    pub category: ReminderCategory,
    pub critical: bool,
    pub origin: ReminderOrigin,
    /// Daily recurrence; `None` for one-shot reminders
    pub time_of_day: Option<NaiveTime>,
    /// Due time of the current occurrence
    pub scheduled_at: Option<NaiveDateTime>,
    pub state: ReminderState,
    /// Due time of the last occurrence that fired
    #[serde(default)]
    pub fired_occurrence: Option<NaiveDateTime>,
}

impl Reminder {
    pub fn fixed(
        description: impl Into<String>,
        language: Language,
        category: ReminderCategory,
        critical: bool,
        time_of_day: Option<NaiveTime>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            language,
            category,
            critical,
            origin: ReminderOrigin::Fixed,
            time_of_day,
            scheduled_at: None,
            state: ReminderState::Pending,
            fired_occurrence: None,
        }
    }

    pub fn custom(
        description: impl Into<String>,
        language: Language,
        category: ReminderCategory,
        critical: bool,
        at: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            language,
            category,
            critical,
            origin: ReminderOrigin::Custom,
            time_of_day: None,
            scheduled_at: Some(at),
            state: ReminderState::Pending,
            fired_occurrence: None,
        }
    }

    /// Spoken text when the reminder fires
    pub fn fire_message(&self) -> String {
        format!("{}: {}", self.category.message(), self.description)
    }

    /// One-shot custom reminder whose only occurrence already fired
    pub fn is_spent(&self) -> bool {
        self.state == ReminderState::Fired && self.origin == ReminderOrigin::Custom
    }

    /// Whether the current occurrence is due at `now` and has not fired yet
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        match self.scheduled_at {
            Some(due) => {
                due <= now
                    && matches!(self.state, ReminderState::Pending | ReminderState::Delayed)
                    && self.fired_occurrence != Some(due)
            }
            None => false,
        }
    }

    /// "task" for fixed reminders, "reminder" for custom ones
    pub(crate) fn noun(&self) -> &'static str {
        match self.origin {
            ReminderOrigin::Fixed => "task",
            ReminderOrigin::Custom => "reminder",
        }
    }
}

/// First instant strictly after `after` that falls on `time_of_day`
pub fn next_occurrence(time_of_day: NaiveTime, after: NaiveDateTime) -> NaiveDateTime {
    let today = after.date().and_time(time_of_day);
    if today > after {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Parse a custom reminder's due time in any accepted format
pub fn parse_reminder_time(raw: &str) -> CareResult<NaiveDateTime> {
    let trimmed = raw.trim();
    REMINDER_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| CareError::InvalidReminderTime(raw.to_string()))
}
