//! # Configuration
//!
//! Process-wide settings read once at startup. Runtime knobs come from the
//! environment (`.env` is loaded by the binary); thresholds and the fixed
//! reminder set come from an optional YAML care profile.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.2.0: Caregiver contact and chat cooldown settings
//! - 1.1.0: YAML care profile for thresholds and fixed reminders
//! - 1.0.0: Initial environment-based configuration

use crate::core::language::{Gender, Language};
use crate::features::reminders::{Reminder, ReminderCategory};
use crate::features::vitals::Thresholds;
use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct CareConfig {
    pub log_level: String,
    /// Directory holding the JSON logs and schedules
    pub data_dir: PathBuf,
    pub poll_interval: Duration,
    pub tick_interval: Duration,
    pub inactivity_threshold: chrono::Duration,
    pub fall_probability: f64,
    pub delay_minutes: i64,
    /// Activity log entries kept on every write
    pub activity_log_keep: usize,
    pub log_trim_window: chrono::Duration,
    pub language: Language,
    pub gender: Gender,
    pub caregiver_contact: String,
    pub caregiver_eta_minutes: u32,
    pub chat_cooldown: chrono::Duration,
    /// TTS command template (`{lang}`, `{file}`, `{text}`); silent when unset
    pub tts_command: Option<String>,
    /// Player command template (`{file}`)
    pub player_command: Option<String>,
    pub profile_path: PathBuf,
    pub socket_path: String,
}

impl Default for CareConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: PathBuf::from("logs"),
            poll_interval: Duration::from_secs(300),
            tick_interval: Duration::from_millis(1000),
            inactivity_threshold: chrono::Duration::seconds(1800),
            fall_probability: 0.1,
            delay_minutes: 10,
            activity_log_keep: 5,
            log_trim_window: chrono::Duration::hours(24),
            language: Language::English,
            gender: Gender::Male,
            caregiver_contact: "Neighbor John".to_string(),
            caregiver_eta_minutes: 5,
            chat_cooldown: chrono::Duration::seconds(2),
            tts_command: None,
            player_command: None,
            profile_path: PathBuf::from("care.yaml"),
            socket_path: crate::ipc::DEFAULT_SOCKET_PATH.to_string(),
        }
    }
}

impl CareConfig {
    /// Build configuration from `CARE_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            log_level: env::var("CARE_LOG_LEVEL").unwrap_or(defaults.log_level),
            data_dir: env::var("CARE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            poll_interval: Duration::from_secs(parse_var("CARE_POLL_INTERVAL_SECS", 300)?),
            tick_interval: Duration::from_millis(parse_var("CARE_TICK_INTERVAL_MS", 1000)?),
            inactivity_threshold: chrono::Duration::seconds(parse_var(
                "CARE_INACTIVITY_SECS",
                1800,
            )?),
            fall_probability: parse_var("CARE_FALL_PROBABILITY", defaults.fall_probability)?,
            delay_minutes: parse_var("CARE_DELAY_MINUTES", defaults.delay_minutes)?,
            activity_log_keep: parse_var("CARE_ACTIVITY_LOG_KEEP", defaults.activity_log_keep)?,
            log_trim_window: chrono::Duration::hours(parse_var("CARE_LOG_TRIM_HOURS", 24)?),
            language: env::var("CARE_LANGUAGE")
                .map(|code| Language::from_code(&code))
                .unwrap_or(defaults.language),
            gender: env::var("CARE_GENDER")
                .map(|label| Gender::from_label(&label))
                .unwrap_or(defaults.gender),
            caregiver_contact: env::var("CARE_CAREGIVER_CONTACT")
                .unwrap_or(defaults.caregiver_contact),
            caregiver_eta_minutes: parse_var(
                "CARE_CAREGIVER_ETA_MINUTES",
                defaults.caregiver_eta_minutes,
            )?,
            chat_cooldown: chrono::Duration::seconds(parse_var("CARE_CHAT_COOLDOWN_SECS", 2)?),
            tts_command: env::var("CARE_TTS_COMMAND").ok().filter(|c| !c.trim().is_empty()),
            player_command: env::var("CARE_PLAYER_COMMAND")
                .ok()
                .filter(|c| !c.trim().is_empty()),
            profile_path: env::var("CARE_PROFILE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.profile_path),
            socket_path: crate::ipc::get_socket_path(),
        };

        if !(0.0..=1.0).contains(&config.fall_probability) {
            return Err(anyhow!(
                "CARE_FALL_PROBABILITY must be between 0 and 1, got {}",
                config.fall_probability
            ));
        }
        if config.delay_minutes < 0 {
            return Err(anyhow!("CARE_DELAY_MINUTES must not be negative"));
        }

        Ok(config)
    }
}

/// Parse an optional environment variable, failing loudly on garbage
fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", name, raw, e)),
        _ => Ok(default),
    }
}

/// A fixed reminder as written in the care profile
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReminderSeed {
    pub description: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub category: ReminderCategory,
    #[serde(default)]
    pub critical: bool,
    /// Daily time of day, `HH:MM`
    pub time: Option<String>,
}

impl ReminderSeed {
    pub fn time_of_day(&self) -> Result<Option<NaiveTime>> {
        match &self.time {
            Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M")
                .map(Some)
                .map_err(|e| anyhow!("Invalid reminder time '{}' for '{}': {}", raw, self.description, e)),
            None => Ok(None),
        }
    }
}

/// Thresholds and fixed reminders for one person
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CareProfile {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_reminders")]
    pub reminders: Vec<ReminderSeed>,
}

impl Default for CareProfile {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            reminders: default_reminders(),
        }
    }
}

impl CareProfile {
    /// Load a profile from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let profile: CareProfile = serde_yaml::from_str(&contents)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load the profile if the file exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let profile = Self::load(path)?;
            info!(
                "Loaded care profile from {} ({} fixed reminders)",
                path.display(),
                profile.reminders.len()
            );
            Ok(profile)
        } else {
            info!("No care profile at {} - using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if t.bp_low.systolic >= t.bp_high.systolic || t.bp_low.diastolic >= t.bp_high.diastolic {
            return Err(anyhow!(
                "Blood pressure low bound {}/{} must be below high bound {}/{}",
                t.bp_low.systolic,
                t.bp_low.diastolic,
                t.bp_high.systolic,
                t.bp_high.diastolic
            ));
        }
        if t.glucose_low >= t.glucose_high {
            return Err(anyhow!(
                "Glucose low bound {} must be below high bound {}",
                t.glucose_low,
                t.glucose_high
            ));
        }

        for seed in &self.reminders {
            if seed.description.trim().is_empty() {
                return Err(anyhow!("Reminder description must not be empty"));
            }
            seed.time_of_day()?;
        }
        Ok(())
    }

    /// Build the fixed reminder list the scheduler seeds from
    pub fn fixed_reminders(&self) -> Result<Vec<Reminder>> {
        self.reminders
            .iter()
            .map(|seed| {
                Ok(Reminder::fixed(
                    seed.description.clone(),
                    seed.language,
                    seed.category,
                    seed.critical,
                    seed.time_of_day()?,
                ))
            })
            .collect()
    }
}

fn default_reminders() -> Vec<ReminderSeed> {
    let seed = |description: &str, language, category, critical, time: &str| ReminderSeed {
        description: description.to_string(),
        language,
        category,
        critical,
        time: Some(time.to_string()),
    };

    vec![
        seed(
            "Take your morning medication",
            Language::English,
            ReminderCategory::Medicine,
            true,
            "08:00",
        ),
        seed(
            "सुबह की दवा लें",
            Language::Hindi,
            ReminderCategory::Medicine,
            true,
            "08:30",
        ),
        seed(
            "Go for a short walk",
            Language::English,
            ReminderCategory::Other,
            false,
            "17:00",
        ),
        seed(
            "डॉक्टर के पास जाएं",
            Language::Hindi,
            ReminderCategory::Doctor,
            true,
            "11:00",
        ),
    ]
}
