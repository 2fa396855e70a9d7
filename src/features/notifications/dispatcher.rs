//! # Feature: Notification Dispatcher
//!
//! Single-flight voice announcements. Every producer (health alerts, reminders,
//! chat, caregiver messages) funnels through one dispatcher; while an
//! announcement is rendering or playing, new requests are dropped rather than
//! queued so stale reminders never pile up audibly.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.1.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Broadcast accepted announcements for IPC subscribers
//! - 1.1.0: Dispatch counters and `wait_idle`
//! - 1.0.0: Initial single-flight dispatcher

use crate::core::{Clock, Language};
use crate::features::notifications::voice::VoiceRenderer;
use crate::store::ActivityLog;
use chrono::NaiveDateTime;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Notify};

/// Capacity of the accepted-announcement broadcast channel
const ANNOUNCEMENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
            Priority::Critical => write!(f, "Critical"),
        }
    }
}

/// A request to speak a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnouncementRequest {
    pub message: String,
    pub language: Language,
    pub priority: Priority,
}

impl AnnouncementRequest {
    pub fn new(message: impl Into<String>, language: Language, priority: Priority) -> Self {
        Self {
            message: message.into(),
            language,
            priority,
        }
    }
}

/// An accepted announcement, as published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub request: AnnouncementRequest,
    pub accepted_at: NaiveDateTime,
}

/// Dispatch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub accepted: u64,
    pub rejected: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    accepted: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

/// Busy flag plus the signal raised whenever it is released
struct Flight {
    busy: Mutex<bool>,
    released: Notify,
}

impl Flight {
    /// Atomic check-and-set. Returns false if something is already in flight.
    fn try_acquire(&self) -> bool {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if *busy {
            false
        } else {
            *busy = true;
            true
        }
    }

    fn release(&self) {
        *self.busy.lock().unwrap_or_else(PoisonError::into_inner) = false;
        self.released.notify_waiters();
    }

    fn is_busy(&self) -> bool {
        *self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owned by the playback worker; releases the flight exactly once when dropped,
/// including on error and panic paths.
struct FlightGuard {
    flight: Arc<Flight>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.flight.release();
    }
}

pub struct NotificationDispatcher {
    renderer: Arc<dyn VoiceRenderer>,
    activity_log: ActivityLog,
    clock: Arc<dyn Clock>,
    flight: Arc<Flight>,
    counters: Arc<Counters>,
    events: broadcast::Sender<Announcement>,
    runtime: Handle,
}

impl NotificationDispatcher {
    /// Create a dispatcher bound to the current tokio runtime.
    ///
    /// Must be called from within a runtime; workers are spawned onto it.
    pub fn new(
        renderer: Arc<dyn VoiceRenderer>,
        activity_log: ActivityLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (events, _) = broadcast::channel(ANNOUNCEMENT_CHANNEL_CAPACITY);
        Self {
            renderer,
            activity_log,
            clock,
            flight: Arc::new(Flight {
                busy: Mutex::new(false),
                released: Notify::new(),
            }),
            counters: Arc::new(Counters::default()),
            events,
            runtime: Handle::current(),
        }
    }

    /// Try to speak `request`. Returns false (and drops the request) when
    /// another announcement is still rendering or playing. Never blocks on
    /// playback; the render/play work runs on a detached worker.
    pub fn announce(&self, request: AnnouncementRequest) -> bool {
        if !self.flight.try_acquire() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Audio already playing, skipping [{}] {}",
                request.priority, request.message
            );
            return false;
        }

        let guard = FlightGuard {
            flight: self.flight.clone(),
        };
        self.counters.accepted.fetch_add(1, Ordering::Relaxed);

        // No subscribers is the normal case without a dashboard
        let _ = self.events.send(Announcement {
            request: request.clone(),
            accepted_at: self.clock.now(),
        });

        let renderer = self.renderer.clone();
        let activity_log = self.activity_log.clone();
        let counters = self.counters.clone();

        self.runtime.spawn(async move {
            let _guard = guard;

            let outcome = match renderer.render(&request.message, request.language).await {
                Ok(clip) => renderer.play(clip).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => debug!("Announcement completed: {}", request.message),
                Err(e) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Error in audio playback: {e}");
                    activity_log.record(format!(
                        "Voice playback failed for '{}' in {}: {}",
                        request.message, request.language, e
                    ));
                }
            }
        });

        true
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    /// Resolve once no announcement is in flight
    pub async fn wait_idle(&self) {
        loop {
            let released = self.flight.released.notified();
            if !self.flight.is_busy() {
                return;
            }
            released.await;
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Announcement> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}
