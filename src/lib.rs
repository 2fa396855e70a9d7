// Core layer - shared types and configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Persistence layer - JSON logs and schedules
pub mod store;

// IPC layer - communication between the agent and its front ends
pub mod ipc;

pub use crate::core::{CareConfig, CareError, CareResult};

pub use features::{
    // Activity
    ActivityMonitor,
    // Notifications
    NotificationDispatcher, VoiceRenderer,
    // Orchestrator
    CareOrchestrator,
    // Reminders
    ReminderScheduler,
};
