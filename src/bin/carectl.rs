use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::time::Duration;

use carewatch::core::{Gender, Language};
use carewatch::features::vitals::VitalsForm;
use carewatch::ipc::{
    connect_with_retry, get_socket_path, new_request_id, CareCommand, CareEvent, ResponseStatus,
};

#[derive(Parser)]
#[command(name = "carectl")]
#[command(about = "Talk to a running CareWatch agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a vitals reading
    Vitals {
        /// Heart rate (bpm)
        heart_rate: String,
        /// Systolic blood pressure
        systolic: String,
        /// Diastolic blood pressure
        diastolic: String,
        /// Blood glucose (mg/dL)
        glucose: String,
    },
    /// Add a one-shot reminder
    Remind {
        /// Due time, "YYYY-MM-DD HH:MM"
        time: String,
        /// What to remind about
        message: String,
        /// medicine, doctor or other
        category: Option<String>,
        /// Delay rather than skip this reminder during a risk episode
        #[arg(long)]
        critical: bool,
    },
    /// Start a chat session
    StartChat,
    /// Send a chat message
    Chat {
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
    /// Set language (en|hi) and gender (male|female)
    Prefs { language: String, gender: String },
    /// Recent health records
    Health {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Recent activity records
    Activity {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Current care status
    Status,
    /// Check the agent is alive
    Ping,
    /// Print announcements as they happen
    Watch,
}

enum Invocation {
    Request(CareCommand),
    Watch,
}

impl Commands {
    fn into_invocation(self) -> Invocation {
        let request_id = new_request_id();
        let cmd = match self {
            Commands::Vitals {
                heart_rate,
                systolic,
                diastolic,
                glucose,
            } => CareCommand::SubmitVitals {
                request_id,
                vitals: VitalsForm {
                    heart_rate: Some(heart_rate),
                    bp_systolic: Some(systolic),
                    bp_diastolic: Some(diastolic),
                    glucose: Some(glucose),
                },
            },
            Commands::Remind {
                time,
                message,
                category,
                critical,
            } => CareCommand::AddReminder {
                request_id,
                time,
                message,
                category,
                critical,
            },
            Commands::StartChat => CareCommand::StartChat { request_id },
            Commands::Chat { words } => CareCommand::Chat {
                request_id,
                message: words.join(" "),
            },
            Commands::Prefs { language, gender } => CareCommand::SetPreferences {
                request_id,
                language: Language::from_code(&language),
                gender: Gender::from_label(&gender),
            },
            Commands::Health { limit } => CareCommand::GetHealth { request_id, limit },
            Commands::Activity { limit } => CareCommand::GetActivity { request_id, limit },
            Commands::Status => CareCommand::GetStatus { request_id },
            Commands::Ping => CareCommand::Ping { request_id },
            Commands::Watch => return Invocation::Watch,
        };
        Invocation::Request(cmd)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let invocation = cli.command.into_invocation();

    let mut client = connect_with_retry(&get_socket_path(), 3, Duration::from_millis(500)).await?;

    match invocation {
        Invocation::Request(cmd) => {
            let response = client.request(cmd).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if let CareEvent::CommandResponse {
                status: ResponseStatus::Error,
                ..
            } = response
            {
                std::process::exit(1);
            }
        }
        Invocation::Watch => loop {
            match client.recv().await? {
                CareEvent::Announcement {
                    message,
                    language,
                    priority,
                    timestamp,
                } => println!("[{timestamp}] ({priority}, {language}) {message}"),
                CareEvent::Heartbeat { .. } => {}
                other => println!("{}", serde_json::to_string(&other)?),
            }
        },
    }

    Ok(())
}
