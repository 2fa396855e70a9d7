//! # Feature: Caregiver Link
//!
//! Raises prioritised alerts to the caregiver and asks them to confirm they
//! stepped in. Emergency alerts also name the local contact and their ETA.
//! Every alert and confirmation lands in the activity log as well as being
//! spoken.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Alerts are spoken in the person's preferred language
//! - 1.0.0: Priority alerts and simulated confirmation

use crate::core::Language;
use crate::features::notifications::{AnnouncementRequest, NotificationDispatcher, Priority};
use crate::store::ActivityLog;
use log::warn;
use std::sync::Arc;

pub const CAREGIVER_CONFIRMED: &str = "Caregiver confirmed: Yes";

/// Alerts and confirmations for the person's caregiver
pub struct CaregiverLink {
    dispatcher: Arc<NotificationDispatcher>,
    activity_log: ActivityLog,
    contact: String,
    eta_minutes: u32,
}

impl CaregiverLink {
    pub fn new(
        dispatcher: Arc<NotificationDispatcher>,
        activity_log: ActivityLog,
        contact: impl Into<String>,
        eta_minutes: u32,
    ) -> Self {
        Self {
            dispatcher,
            activity_log,
            contact: contact.into(),
            eta_minutes,
        }
    }

    /// Log and announce an alert. Emergencies also dispatch the local contact.
    pub fn send_alert(
        &self,
        message: &str,
        emergency: bool,
        priority: Priority,
        language: Language,
    ) -> String {
        let mut alert = format!("Alert (Priority: {priority}): {message}");
        if emergency {
            alert.push_str(&format!(
                " Notifying local contact: {} to check on user. Estimated arrival: {} minutes.",
                self.contact, self.eta_minutes
            ));
            warn!("🚨 {alert}");
        }

        self.activity_log.record(alert.clone());
        self.dispatcher
            .announce(AnnouncementRequest::new(alert.clone(), language, priority));
        alert
    }

    /// Ask the caregiver to confirm they responded. Confirmation is simulated.
    pub fn confirm_action(&self, message: &str, language: Language) -> String {
        self.dispatcher.announce(AnnouncementRequest::new(
            format!("Caregiver, {message} Did you help them rest? (Simulated: Yes)"),
            language,
            Priority::High,
        ));
        self.activity_log.record(CAREGIVER_CONFIRMED);
        CAREGIVER_CONFIRMED.to_string()
    }
}
