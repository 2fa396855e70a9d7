//! # Caregiver Feature
//!
//! Priority alerts to the caregiver and simulated confirmation of their response.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod link;

pub use link::{CaregiverLink, CAREGIVER_CONFIRMED};
