//! # Chat Feature
//!
//! Companionship chat used on request and whenever inactivity is detected.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod engagement;

pub use engagement::{greeting, keyword_reply, ChatEngagement, ChatMessage, ChatRole};
