//! # Orchestrator Feature
//!
//! The periodic care loop and the operations exposed to front ends.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod orchestrator;

pub use orchestrator::{CareOrchestrator, CareStatus, CycleReport, SubmissionOutcome};
