//! # Notifications Feature
//!
//! Single-flight voice announcements over a pluggable renderer.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false

pub mod dispatcher;
pub mod voice;

pub use dispatcher::{
    Announcement, AnnouncementRequest, DispatchStats, NotificationDispatcher, Priority,
};
pub use voice::{AudioClip, CommandRenderer, SilentRenderer, VoiceRenderer};
