//! # Features
//!
//! Each feature is a self-contained module: vitals evaluation, activity
//! monitoring, announcements, reminders, caregiver alerts, chat, and the
//! orchestrator that drives them.

pub mod activity;
pub mod caregiver;
pub mod chat;
pub mod notifications;
pub mod orchestrator;
pub mod reminders;
pub mod vitals;

pub use activity::ActivityMonitor;
pub use caregiver::CaregiverLink;
pub use chat::{ChatEngagement, ChatMessage, ChatRole};
pub use notifications::{
    AnnouncementRequest, CommandRenderer, NotificationDispatcher, Priority, SilentRenderer,
    VoiceRenderer,
};
pub use orchestrator::{CareOrchestrator, CareStatus, CycleReport, SubmissionOutcome};
pub use reminders::{AdaptCause, Reminder, ReminderCategory, ReminderScheduler, ReminderState};
pub use vitals::{evaluate, suggestions, RiskStatus, Thresholds, VitalsForm, VitalsSnapshot};
