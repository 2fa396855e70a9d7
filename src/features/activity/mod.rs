//! # Activity Feature
//!
//! Inactivity and fall detection for the person being monitored.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod monitor;

pub use monitor::{ActivityMonitor, DEFAULT_FALL_PROBABILITY, DEFAULT_INACTIVITY_SECS};
