//! Error taxonomy shared by every care component.

use thiserror::Error;

/// Failures surfaced by the care engine.
///
/// None of these are fatal to the process: callers log them, keep their
/// in-memory state, and report `status: error` to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CareError {
    /// Malformed vitals or chat/reminder payload (missing or non-numeric fields)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Custom reminder time that matches none of the accepted formats
    #[error("invalid reminder time '{0}': expected YYYY-MM-DD HH:MM")]
    InvalidReminderTime(String),

    /// Voice backend failed to render or play an announcement
    #[error("voice render failed: {0}")]
    RenderFailure(String),

    /// Store read/write error
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

pub type CareResult<T> = Result<T, CareError>;
