//! # Voice Rendering
//!
//! The audio backend behind announcements. Rendering turns text into a playable
//! clip; playback resolves when the clip has finished.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Command-based renderer with timeouts and temp-file cleanup
//! - 1.0.0: Silent renderer

use crate::core::{CareError, CareResult, Language};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Default limit for one TTS or playback command
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;

/// A rendered announcement ready for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub text: String,
    pub language: Language,
    /// Backing file, if the renderer produced one
    pub path: Option<PathBuf>,
}

#[async_trait]
pub trait VoiceRenderer: Send + Sync {
    async fn render(&self, message: &str, language: Language) -> CareResult<AudioClip>;

    /// Play a clip, resolving when playback completes
    async fn play(&self, clip: AudioClip) -> CareResult<()>;
}

/// Logs announcements instead of speaking them
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentRenderer;

#[async_trait]
impl VoiceRenderer for SilentRenderer {
    async fn render(&self, message: &str, language: Language) -> CareResult<AudioClip> {
        Ok(AudioClip {
            text: message.to_string(),
            language,
            path: None,
        })
    }

    async fn play(&self, clip: AudioClip) -> CareResult<()> {
        info!("🔊 [{}] {}", clip.language, clip.text);
        Ok(())
    }
}

/// Renders through an external TTS command and plays through an external player.
///
/// Templates are split on whitespace; each piece may contain `{lang}`, `{file}`
/// and `{text}` placeholders, e.g. `espeak-ng -v {lang} -w {file} {text}` and
/// `aplay -q {file}`.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    tts_template: String,
    player_template: Option<String>,
    command_timeout: Duration,
}

impl CommandRenderer {
    pub fn new(tts_template: String, player_template: Option<String>) -> Self {
        Self {
            tts_template,
            player_template,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Expand a command template into program and arguments
    fn expand(template: &str, language: Language, file: &str, text: &str) -> Option<(String, Vec<String>)> {
        let mut parts = template.split_whitespace().map(|part| {
            part.replace("{lang}", language.code())
                .replace("{file}", file)
                .replace("{text}", text)
        });
        let program = parts.next()?;
        Some((program, parts.collect()))
    }

    async fn run(&self, program: &str, args: &[String]) -> CareResult<()> {
        debug!("Running voice command: {program} {args:?}");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        match timeout(self.command_timeout, cmd.output()).await {
            Ok(Ok(output)) if output.status.success() => Ok(()),
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(CareError::RenderFailure(format!(
                    "{program} exited with {}: {}",
                    output.status,
                    stderr.trim()
                )))
            }
            Ok(Err(e)) => Err(CareError::RenderFailure(format!(
                "failed to start {program}: {e}"
            ))),
            Err(_) => Err(CareError::RenderFailure(format!(
                "{program} timed out after {}s",
                self.command_timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl VoiceRenderer for CommandRenderer {
    async fn render(&self, message: &str, language: Language) -> CareResult<AudioClip> {
        let path = std::env::temp_dir().join(format!("carewatch_{}.wav", uuid::Uuid::new_v4()));
        let file = path.to_string_lossy().to_string();

        let (program, args) = Self::expand(&self.tts_template, language, &file, message)
            .ok_or_else(|| CareError::RenderFailure("empty TTS command".to_string()))?;

        if let Err(e) = self.run(&program, &args).await {
            // Partial output from a failed render is useless
            let _ = tokio::fs::remove_file(&path).await;
            return Err(e);
        }

        Ok(AudioClip {
            text: message.to_string(),
            language,
            path: Some(path),
        })
    }

    async fn play(&self, clip: AudioClip) -> CareResult<()> {
        let file = clip
            .path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let result = match &self.player_template {
            Some(template) => match Self::expand(template, clip.language, &file, &clip.text) {
                Some((program, args)) => self.run(&program, &args).await,
                None => Err(CareError::RenderFailure("empty player command".to_string())),
            },
            None => {
                info!("🔊 [{}] {} (no player configured)", clip.language, clip.text);
                Ok(())
            }
        };

        if let Some(path) = &clip.path {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!("Failed to cleanup audio file {}: {e}", path.display());
            }
        }

        result
    }
}
