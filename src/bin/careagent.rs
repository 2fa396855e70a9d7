use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;

use carewatch::core::{CareConfig, CareProfile, Clock, SystemClock, ThreadRandom};
use carewatch::features::notifications::{
    CommandRenderer, NotificationDispatcher, SilentRenderer, VoiceRenderer,
};
use carewatch::features::orchestrator::CareOrchestrator;
use carewatch::features::reminders::ReminderScheduler;
use carewatch::ipc::IpcServer;
use carewatch::store::{ActivityLog, JsonFileStore, PersistenceStore};

/// Interval between IPC heartbeats
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How long shutdown waits for an announcement in progress
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = CareConfig::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting CareWatch agent...");

    let profile = CareProfile::load_or_default(&config.profile_path)?;
    let store: Arc<dyn PersistenceStore> = Arc::new(JsonFileStore::open(config.data_dir.clone())?);
    info!("💾 Data directory: {}", config.data_dir.display());

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let activity_log = ActivityLog::new(store.clone(), clock.clone(), config.activity_log_keep);

    let renderer: Arc<dyn VoiceRenderer> = match &config.tts_command {
        Some(tts) => {
            info!("🔊 Voice output via `{tts}`");
            Arc::new(CommandRenderer::new(tts.clone(), config.player_command.clone()))
        }
        None => {
            warn!("No CARE_TTS_COMMAND set; announcements will only be logged");
            Arc::new(SilentRenderer)
        }
    };

    let dispatcher = Arc::new(NotificationDispatcher::new(
        renderer,
        activity_log.clone(),
        clock.clone(),
    ));
    let scheduler = Arc::new(ReminderScheduler::new(
        profile.fixed_reminders()?,
        store.clone(),
        dispatcher.clone(),
        activity_log,
        clock.clone(),
    ));
    let orchestrator = Arc::new(CareOrchestrator::new(
        &config,
        profile.thresholds,
        store,
        dispatcher.clone(),
        scheduler.clone(),
        clock,
        Box::new(ThreadRandom),
        Box::new(ThreadRandom),
    ));

    // IPC is optional: the care loops keep running without it
    let ipc_server = Arc::new(IpcServer::new(
        orchestrator.clone(),
        dispatcher.clone(),
        config.socket_path.clone(),
    ));
    match ipc_server.clone().start().await {
        Ok(()) => ipc_server.clone().start_heartbeat(HEARTBEAT_INTERVAL),
        Err(e) => error!("Failed to start IPC server: {e}. Front ends will be unavailable."),
    }

    let reminder_loop = tokio::spawn(scheduler.run(config.tick_interval));
    let care_loop = tokio::spawn(orchestrator.run(config.poll_interval));

    tokio::signal::ctrl_c().await?;
    info!("Shutting down CareWatch agent...");

    reminder_loop.abort();
    care_loop.abort();
    if tokio::time::timeout(SHUTDOWN_GRACE, dispatcher.wait_idle())
        .await
        .is_err()
    {
        warn!("Announcement still playing at shutdown");
    }
    if let Err(e) = std::fs::remove_file(&config.socket_path) {
        warn!("Failed to remove IPC socket {}: {e}", config.socket_path);
    }

    Ok(())
}
