//! # Vitals Feature
//!
//! Threshold-based health risk classification with ordered advisories.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod evaluator;

pub use evaluator::{
    evaluate, suggestions, Advisory, BloodPressure, RiskStatus, Thresholds, VitalsForm,
    VitalsSnapshot, VitalsSource,
};
