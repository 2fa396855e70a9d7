//! # Core Module
//!
//! Shared configuration, error taxonomy, injectable clock/randomness and
//! language preferences for the care engine.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Add clock and random sources for deterministic tests
//! - 1.0.0: Initial creation with config and error modules

pub mod clock;
pub mod config;
pub mod error;
pub mod language;

// Re-export commonly used items
pub use clock::{Clock, FixedRandom, ManualClock, RandomSource, SystemClock, ThreadRandom};
pub use config::{CareConfig, CareProfile, ReminderSeed};
pub use error::{CareError, CareResult};
pub use language::{Gender, Language};
