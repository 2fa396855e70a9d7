//! # Feature: Vitals Evaluation
//!
//! Pure classification of a vitals snapshot against thresholds, plus the
//! advisory list for every violated condition. No I/O, no state.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Raw form parsing with `InvalidInput` errors
//! - 1.0.0: Initial threshold checks and suggestions

use crate::core::{CareError, CareResult};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VitalsSource {
    User,
    Sensor,
}

/// One immutable reading of the monitored vitals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    pub heart_rate: u32,
    pub systolic: u32,
    pub diastolic: u32,
    pub glucose: u32,
    pub recorded_at: NaiveDateTime,
    pub source: VitalsSource,
}

/// Raw vitals as posted by the presentation layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VitalsForm {
    pub heart_rate: Option<String>,
    pub bp_systolic: Option<String>,
    pub bp_diastolic: Option<String>,
    pub glucose: Option<String>,
}

impl VitalsForm {
    pub fn new(heart_rate: u32, systolic: u32, diastolic: u32, glucose: u32) -> Self {
        Self {
            heart_rate: Some(heart_rate.to_string()),
            bp_systolic: Some(systolic.to_string()),
            bp_diastolic: Some(diastolic.to_string()),
            glucose: Some(glucose.to_string()),
        }
    }

    /// Validate every field and build a snapshot.
    ///
    /// Missing, non-numeric and zero fields are all `InvalidInput`; a zero is
    /// what an empty dashboard field submits.
    pub fn parse(
        &self,
        recorded_at: NaiveDateTime,
        source: VitalsSource,
    ) -> CareResult<VitalsSnapshot> {
        Ok(VitalsSnapshot {
            heart_rate: parse_field("heart_rate", self.heart_rate.as_deref())?,
            systolic: parse_field("bp_systolic", self.bp_systolic.as_deref())?,
            diastolic: parse_field("bp_diastolic", self.bp_diastolic.as_deref())?,
            glucose: parse_field("glucose", self.glucose.as_deref())?,
            recorded_at,
            source,
        })
    }
}

fn parse_field(name: &str, raw: Option<&str>) -> CareResult<u32> {
    let raw = raw
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CareError::InvalidInput(format!("{name} is required")))?;

    let value: u32 = raw
        .parse()
        .map_err(|_| CareError::InvalidInput(format!("{name} must be a whole number, got '{raw}'")))?;

    if value == 0 {
        return Err(CareError::InvalidInput(format!("{name} is required")));
    }
    Ok(value)
}

/// Systolic/diastolic pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: u32,
    pub diastolic: u32,
}

/// Classification bounds, read-only after startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub hr_high: u32,
    pub bp_high: BloodPressure,
    pub bp_low: BloodPressure,
    pub glucose_high: u32,
    pub glucose_low: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hr_high: 100,
            bp_high: BloodPressure {
                systolic: 140,
                diastolic: 90,
            },
            bp_low: BloodPressure {
                systolic: 90,
                diastolic: 60,
            },
            glucose_high: 130,
            glucose_low: 70,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskStatus {
    Normal,
    AtRisk,
}

impl RiskStatus {
    /// Wording used in spoken and API responses
    pub fn label(&self) -> &'static str {
        match self {
            RiskStatus::Normal => "Healthy",
            RiskStatus::AtRisk => "At Risk",
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One violated condition, in fixed check order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Advisory {
    HighHeartRate,
    HighBloodPressure,
    LowBloodPressure,
    HighGlucose,
    LowGlucose,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::HighHeartRate => {
                "Your heart rate is high. Please try to rest and breathe deeply."
            }
            Advisory::HighBloodPressure => {
                "Your blood pressure is high. Please sit down and avoid stress."
            }
            Advisory::LowBloodPressure => {
                "Your blood pressure is low. Please have some water or a snack."
            }
            Advisory::HighGlucose => "Your glucose is high. Avoid sweets and consult your doctor.",
            Advisory::LowGlucose => "Your glucose is low. Please eat a small piece of fruit.",
        }
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Every violated condition in order: heart rate, high BP, low BP, high glucose, low glucose
pub fn suggestions(snapshot: &VitalsSnapshot, thresholds: &Thresholds) -> Vec<Advisory> {
    let mut advisories = Vec::new();

    if snapshot.heart_rate > thresholds.hr_high {
        advisories.push(Advisory::HighHeartRate);
    }
    if snapshot.systolic > thresholds.bp_high.systolic
        || snapshot.diastolic > thresholds.bp_high.diastolic
    {
        advisories.push(Advisory::HighBloodPressure);
    }
    if snapshot.systolic < thresholds.bp_low.systolic
        || snapshot.diastolic < thresholds.bp_low.diastolic
    {
        advisories.push(Advisory::LowBloodPressure);
    }
    if snapshot.glucose > thresholds.glucose_high {
        advisories.push(Advisory::HighGlucose);
    }
    if snapshot.glucose < thresholds.glucose_low {
        advisories.push(Advisory::LowGlucose);
    }

    advisories
}

pub fn evaluate(snapshot: &VitalsSnapshot, thresholds: &Thresholds) -> RiskStatus {
    if suggestions(snapshot, thresholds).is_empty() {
        RiskStatus::Normal
    } else {
        RiskStatus::AtRisk
    }
}
