//! # IPC Module
//!
//! Request/response commands and pushed announcements between the care agent
//! and its front ends.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Announcement and heartbeat events
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{connect_with_retry, IpcClient};
pub use protocol::{new_request_id, CareCommand, CareEvent, ResponseStatus};
pub use server::IpcServer;

/// Default socket path for IPC communication
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/carewatch.sock";

/// Get the socket path from environment or use default
pub fn get_socket_path() -> String {
    std::env::var("CARE_IPC_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string())
}
