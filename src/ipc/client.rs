//! # IPC Client
//!
//! Unix socket client used by `carectl` and dashboards to talk to the agent.

use crate::ipc::protocol::{encode_message, read_frame, CareCommand, CareEvent};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long to wait for the response to a request
const READ_TIMEOUT: Duration = Duration::from_secs(30);

pub struct IpcClient {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl IpcClient {
    /// Connect to the agent's IPC server
    pub async fn connect(socket_path: &str) -> Result<Self> {
        info!("Connecting to IPC server at {}", socket_path);

        let stream = timeout(CONNECT_TIMEOUT, UnixStream::connect(socket_path))
            .await
            .map_err(|_| anyhow!("Connection timeout"))?
            .map_err(|e| anyhow!("Failed to connect: {}", e))?;

        let (reader, writer) = stream.into_split();
        Ok(Self { reader, writer })
    }

    /// Send a command without waiting for its response
    pub async fn send(&mut self, cmd: &CareCommand) -> Result<()> {
        let data = encode_message(cmd)?;
        self.writer.write_all(&data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next event from the agent (responses, announcements or heartbeats)
    pub async fn recv(&mut self) -> Result<CareEvent> {
        let frame = read_frame(&mut self.reader).await?;
        Ok(serde_json::from_slice(&frame)?)
    }

    /// Send a command and wait for the response carrying its request id.
    /// Announcements and heartbeats arriving in between are skipped.
    pub async fn request(&mut self, cmd: CareCommand) -> Result<CareEvent> {
        let request_id = cmd.request_id().to_string();
        self.send(&cmd).await?;

        timeout(READ_TIMEOUT, async {
            loop {
                match self.recv().await? {
                    CareEvent::CommandResponse {
                        request_id: ref id, ..
                    } if *id != request_id => {
                        debug!("Ignoring response for other request {}", id);
                    }
                    event @ CareEvent::CommandResponse { .. } => return Ok::<_, anyhow::Error>(event),
                    other => debug!("Skipping event while waiting: {:?}", other),
                }
            }
        })
        .await
        .map_err(|_| anyhow!("Timed out waiting for response to {}", request_id))?
    }
}

/// Try to connect with retries
pub async fn connect_with_retry(
    socket_path: &str,
    max_attempts: u32,
    delay: Duration,
) -> Result<IpcClient> {
    let mut attempt = 1;
    loop {
        match IpcClient::connect(socket_path).await {
            Ok(client) => return Ok(client),
            Err(e) if attempt < max_attempts => {
                warn!(
                    "Connection attempt {} failed: {}. Retrying in {:?}...",
                    attempt, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to connect after {} attempts: {}",
                    max_attempts,
                    e
                ))
            }
        }
    }
}
