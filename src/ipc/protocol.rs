//! # IPC Protocol
//!
//! Message types for agent <-> front end communication over a Unix socket.
//!
//! Uses length-prefixed JSON framing:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON payload

use crate::core::{Gender, Language};
use crate::features::notifications::{Announcement, Priority};
use crate::features::vitals::VitalsForm;
use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Largest frame either side will accept
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

// ============================================================================
// Agent -> Client Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Events sent from the agent to connected clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CareEvent {
    /// Response to a command
    CommandResponse {
        request_id: String,
        status: ResponseStatus,
        message: String,
        data: Option<serde_json::Value>,
    },
    /// An announcement the dispatcher accepted
    Announcement {
        message: String,
        language: Language,
        priority: Priority,
        timestamp: NaiveDateTime,
    },
    /// Heartbeat to keep connection alive
    Heartbeat { timestamp: i64 },
}

impl CareEvent {
    pub fn success(request_id: String, message: impl Into<String>, data: Option<serde_json::Value>) -> Self {
        CareEvent::CommandResponse {
            request_id,
            status: ResponseStatus::Success,
            message: message.into(),
            data,
        }
    }

    pub fn error(request_id: String, message: impl Into<String>) -> Self {
        CareEvent::CommandResponse {
            request_id,
            status: ResponseStatus::Error,
            message: message.into(),
            data: None,
        }
    }
}

impl From<Announcement> for CareEvent {
    fn from(announcement: Announcement) -> Self {
        CareEvent::Announcement {
            message: announcement.request.message,
            language: announcement.request.language,
            priority: announcement.request.priority,
            timestamp: announcement.accepted_at,
        }
    }
}

// ============================================================================
// Client -> Agent Commands
// ============================================================================

/// Commands sent from a client to the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CareCommand {
    SubmitVitals {
        request_id: String,
        vitals: VitalsForm,
    },
    AddReminder {
        request_id: String,
        /// `YYYY-MM-DD HH:MM`
        time: String,
        message: String,
        #[serde(default)]
        category: Option<String>,
        #[serde(default)]
        critical: bool,
    },
    StartChat {
        request_id: String,
    },
    Chat {
        request_id: String,
        message: String,
    },
    SetPreferences {
        request_id: String,
        language: Language,
        gender: Gender,
    },
    GetHealth {
        request_id: String,
        limit: usize,
    },
    GetActivity {
        request_id: String,
        limit: usize,
    },
    GetStatus {
        request_id: String,
    },
    Ping {
        request_id: String,
    },
}

impl CareCommand {
    pub fn request_id(&self) -> &str {
        match self {
            CareCommand::SubmitVitals { request_id, .. }
            | CareCommand::AddReminder { request_id, .. }
            | CareCommand::StartChat { request_id }
            | CareCommand::Chat { request_id, .. }
            | CareCommand::SetPreferences { request_id, .. }
            | CareCommand::GetHealth { request_id, .. }
            | CareCommand::GetActivity { request_id, .. }
            | CareCommand::GetStatus { request_id }
            | CareCommand::Ping { request_id } => request_id,
        }
    }
}

/// Fresh id for a command
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// Framing - Length-prefixed JSON messages
// ============================================================================

/// Encode a message with length prefix
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_FRAME_BYTES {
        return Err(anyhow!("Message too large: {} bytes", json.len()));
    }
    let len = json.len() as u32;
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Read a length-prefixed message from a blocking reader
pub fn decode_message<T: for<'de> Deserialize<'de>, R: Read>(reader: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_BYTES {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    Ok(serde_json::from_slice(&buf)?)
}

/// Read one frame body from an async reader
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_BYTES {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}
