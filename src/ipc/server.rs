//! # IPC Server
//!
//! Unix socket server exposing the care agent to dashboards and the CLI.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Forward accepted announcements and heartbeats to every client
//! - 1.0.0: Initial request/response command handling

use crate::core::CareError;
use crate::features::notifications::NotificationDispatcher;
use crate::features::orchestrator::CareOrchestrator;
use crate::features::reminders::ReminderCategory;
use crate::ipc::protocol::{encode_message, read_frame, CareCommand, CareEvent};
use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};

/// Maximum number of connected clients
const MAX_CLIENTS: usize = 10;

/// Broadcast channel capacity for events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Response channel capacity per client
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// Largest history slice a client may ask for
const MAX_HISTORY_LIMIT: usize = 500;

/// IPC server handle for the agent
#[derive(Clone)]
pub struct IpcServer {
    orchestrator: Arc<CareOrchestrator>,
    dispatcher: Arc<NotificationDispatcher>,
    socket_path: String,
    /// Broadcast sender for events to all clients
    event_tx: broadcast::Sender<CareEvent>,
    /// Connected client count
    client_count: Arc<RwLock<usize>>,
    /// Server start time for uptime calculation
    start_time: Instant,
}

impl IpcServer {
    /// Create a new IPC server (does not start listening yet)
    pub fn new(
        orchestrator: Arc<CareOrchestrator>,
        dispatcher: Arc<NotificationDispatcher>,
        socket_path: impl Into<String>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            orchestrator,
            dispatcher,
            socket_path: socket_path.into(),
            event_tx,
            client_count: Arc::new(RwLock::new(0)),
            start_time: Instant::now(),
        }
    }

    /// Bind the socket and start the accept loop and announcement forwarding
    pub async fn start(self: Arc<Self>) -> Result<()> {
        // Remove a stale socket file left by a previous run
        if std::path::Path::new(&self.socket_path).exists() {
            std::fs::remove_file(&self.socket_path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        info!("📡 IPC server listening on {}", self.socket_path);

        let server = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let client_count = *server.client_count.read().await;
                        if client_count >= MAX_CLIENTS {
                            warn!("Maximum IPC clients reached ({}), rejecting connection", MAX_CLIENTS);
                            continue;
                        }

                        *server.client_count.write().await += 1;
                        info!("Client connected (total: {})", client_count + 1);

                        let server_clone = server.clone();
                        let client_count_ref = server.client_count.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server_clone.handle_client(stream).await {
                                debug!("Client handler ended: {}", e);
                            }
                            *client_count_ref.write().await -= 1;
                            info!("Client disconnected");
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept IPC connection: {}", e);
                    }
                }
            }
        });

        self.forward_announcements();
        Ok(())
    }

    /// Relay every accepted announcement to connected clients
    fn forward_announcements(&self) {
        let mut announcements = self.dispatcher.subscribe();
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            loop {
                match announcements.recv().await {
                    Ok(announcement) => {
                        let _ = event_tx.send(CareEvent::from(announcement));
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Announcement relay lagged behind by {} events", n);
                    }
                }
            }
        });
    }

    /// Handle a connected client
    async fn handle_client(self: Arc<Self>, stream: UnixStream) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        let mut event_rx = self.event_tx.subscribe();
        let (response_tx, mut response_rx) = mpsc::channel::<CareEvent>(RESPONSE_CHANNEL_CAPACITY);

        // Writer task: direct responses plus broadcast events
        let write_handle = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    response = response_rx.recv() => match response {
                        Some(response) => response,
                        None => break,
                    },
                    next = event_rx.recv() => match next {
                        Ok(event) => event,
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Client lagged behind by {} events", n);
                            continue;
                        }
                    },
                };

                match encode_message(&event) {
                    Ok(data) => {
                        if let Err(e) = writer.write_all(&data).await {
                            debug!("Failed to write to client: {}", e);
                            break;
                        }
                        if let Err(e) = writer.flush().await {
                            debug!("Failed to flush to client: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to encode event: {}", e);
                    }
                }
            }
        });

        loop {
            let frame = match read_frame(&mut reader).await {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Client stream closed: {}", e);
                    break;
                }
            };

            let response = match serde_json::from_slice::<CareCommand>(&frame) {
                Ok(cmd) => {
                    debug!("Processing command: {:?}", cmd);
                    self.process_command(cmd)
                }
                Err(e) => {
                    warn!("Failed to parse command from client: {}", e);
                    CareEvent::error(String::new(), format!("Invalid command: {e}"))
                }
            };

            if response_tx.send(response).await.is_err() {
                break;
            }
        }

        write_handle.abort();
        Ok(())
    }

    /// Run one command against the orchestrator and build its response
    pub fn process_command(&self, cmd: CareCommand) -> CareEvent {
        let request_id = cmd.request_id().to_string();
        let care = &self.orchestrator;

        let result: Result<(String, Option<serde_json::Value>), CareError> = match cmd {
            CareCommand::SubmitVitals { vitals, .. } => care
                .submit_vitals(&vitals)
                .map(|outcome| (outcome.message.clone(), serde_json::to_value(&outcome).ok())),
            CareCommand::AddReminder {
                time,
                message,
                category,
                critical,
                ..
            } => {
                let category = ReminderCategory::from_label(category.as_deref().unwrap_or("other"));
                care.add_custom_reminder(&time, &message, category, critical)
                    .map(|reminder| {
                        (
                            "Reminder set successfully".to_string(),
                            serde_json::to_value(&reminder).ok(),
                        )
                    })
            }
            CareCommand::StartChat { .. } => {
                let history = care.start_chat();
                Ok(("Chat started".to_string(), serde_json::to_value(&history).ok()))
            }
            CareCommand::Chat { message, .. } => {
                let history = care.chat(&message);
                Ok(("ok".to_string(), serde_json::to_value(&history).ok()))
            }
            CareCommand::SetPreferences {
                language, gender, ..
            } => {
                care.set_preferences(language, gender);
                Ok((format!("Preferences set: {language}, {gender}"), None))
            }
            CareCommand::GetHealth { limit, .. } => {
                let records = care.recent_health(limit.min(MAX_HISTORY_LIMIT));
                Ok((format!("{} records", records.len()), serde_json::to_value(&records).ok()))
            }
            CareCommand::GetActivity { limit, .. } => {
                let records = care.recent_activity(limit.min(MAX_HISTORY_LIMIT));
                Ok((format!("{} records", records.len()), serde_json::to_value(&records).ok()))
            }
            CareCommand::GetStatus { .. } => {
                let status = care.status();
                let mut data = serde_json::to_value(&status).ok();
                if let Some(serde_json::Value::Object(map)) = data.as_mut() {
                    map.insert(
                        "uptime_seconds".to_string(),
                        serde_json::Value::from(self.start_time.elapsed().as_secs()),
                    );
                }
                Ok(("ok".to_string(), data))
            }
            CareCommand::Ping { .. } => Ok(("pong".to_string(), None)),
        };

        match result {
            Ok((message, data)) => CareEvent::success(request_id, message, data),
            Err(e) => {
                debug!("Command {} failed: {}", request_id, e);
                CareEvent::error(request_id, e.to_string())
            }
        }
    }

    /// Broadcast an event to all connected clients
    pub fn broadcast(&self, event: CareEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Get connected client count
    pub async fn client_count(&self) -> usize {
        *self.client_count.read().await
    }

    /// Send a heartbeat to all clients
    pub fn send_heartbeat(&self) {
        let timestamp = chrono::Utc::now().timestamp();
        self.broadcast(CareEvent::Heartbeat { timestamp });
    }

    /// Send heartbeats every `period` in the background
    pub fn start_heartbeat(self: Arc<Self>, period: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                self.send_heartbeat();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CareConfig, FixedRandom, ManualClock};
    use crate::features::notifications::SilentRenderer;
    use crate::features::reminders::ReminderScheduler;
    use crate::features::vitals::{Thresholds, VitalsForm};
    use crate::ipc::client::IpcClient;
    use crate::ipc::protocol::{new_request_id, ResponseStatus};
    use crate::store::{ActivityLog, MemoryStore};
    use chrono::NaiveDate;

    fn server(socket_path: String) -> Arc<IpcServer> {
        let config = CareConfig {
            activity_log_keep: 100,
            ..CareConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap(),
        ));
        let log = ActivityLog::new(store.clone(), clock.clone(), config.activity_log_keep);
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::new(SilentRenderer),
            log.clone(),
            clock.clone(),
        ));
        let scheduler = Arc::new(ReminderScheduler::new(
            Vec::new(),
            store.clone(),
            dispatcher.clone(),
            log,
            clock.clone(),
        ));
        let orchestrator = Arc::new(CareOrchestrator::new(
            &config,
            Thresholds::default(),
            store,
            dispatcher.clone(),
            scheduler,
            clock,
            Box::new(FixedRandom(0.5)),
            Box::new(FixedRandom(0.5)),
        ));
        Arc::new(IpcServer::new(orchestrator, dispatcher, socket_path))
    }

    fn status_of(event: &CareEvent) -> (ResponseStatus, String) {
        match event {
            CareEvent::CommandResponse { status, message, .. } => (*status, message.clone()),
            other => panic!("Expected a response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_process_command_maps_errors() {
        let server = server("/tmp/unused.sock".to_string());

        let response = server.process_command(CareCommand::SubmitVitals {
            request_id: "v-1".to_string(),
            vitals: VitalsForm::default(),
        });
        assert_eq!(status_of(&response).0, ResponseStatus::Error);

        let response = server.process_command(CareCommand::AddReminder {
            request_id: "r-1".to_string(),
            time: "not a time".to_string(),
            message: "Take medicine".to_string(),
            category: Some("medicine".to_string()),
            critical: true,
        });
        let (status, message) = status_of(&response);
        assert_eq!(status, ResponseStatus::Error);
        assert!(message.contains("not a time"));
    }

    #[tokio::test]
    async fn test_process_command_success() {
        let server = server("/tmp/unused.sock".to_string());

        let response = server.process_command(CareCommand::SubmitVitals {
            request_id: "v-2".to_string(),
            vitals: VitalsForm::new(72, 120, 80, 100),
        });
        assert_eq!(
            status_of(&response),
            (
                ResponseStatus::Success,
                "Successful submission. Your health status is Healthy.".to_string()
            )
        );

        let response = server.process_command(CareCommand::GetHealth {
            request_id: "h-1".to_string(),
            limit: 5,
        });
        match response {
            CareEvent::CommandResponse { data: Some(data), .. } => {
                assert_eq!(data.as_array().map(Vec::len), Some(1));
            }
            other => panic!("Unexpected response {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("care.sock").to_string_lossy().to_string();
        let server = server(socket_path.clone());
        server.clone().start().await.unwrap();

        let mut client = IpcClient::connect(&socket_path).await.unwrap();
        let request_id = new_request_id();
        let response = client
            .request(CareCommand::Ping {
                request_id: request_id.clone(),
            })
            .await
            .unwrap();

        match response {
            CareEvent::CommandResponse {
                request_id: id,
                status,
                message,
                ..
            } => {
                assert_eq!(id, request_id);
                assert_eq!(status, ResponseStatus::Success);
                assert_eq!(message, "pong");
            }
            other => panic!("Unexpected response {other:?}"),
        }
        assert_eq!(server.client_count().await, 1);
    }
}
