//! Host playback engines

use super::{PlaybackEngine, PlaybackFailure, Utterance, Voice};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Prints what would be spoken. Used when no synthesizer is configured.
#[derive(Debug, Default)]
pub struct PrintPlaybackEngine;

#[async_trait]
impl PlaybackEngine for PrintPlaybackEngine {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    async fn speak(&self, utterance: &Utterance) -> Result<(), PlaybackFailure> {
        println!("🔊 [{}] {}", utterance.locale, utterance.text);
        Ok(())
    }
}

/// Pipes utterance text to an external synthesizer such as `say` or
/// `espeak-ng --stdin`.
///
/// `{voice}`, `{locale}`, `{rate}`, `{pitch}` and `{volume}` in the arguments
/// are substituted per utterance. A `{voice}` placeholder with no selected
/// voice falls back to the locale.
#[derive(Debug, Clone)]
pub struct CommandPlaybackEngine {
    program: String,
    args: Vec<String>,
    voices: Vec<Voice>,
}

impl CommandPlaybackEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            voices: Vec::new(),
        }
    }

    /// Parse a whitespace-separated command line. `None` when blank.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect()))
    }

    #[must_use]
    pub fn with_voices(mut self, voices: Vec<Voice>) -> Self {
        self.voices = voices;
        self
    }

    fn expand_args(&self, utterance: &Utterance) -> Vec<String> {
        let voice = utterance
            .voice
            .as_ref()
            .map_or(utterance.locale.as_str(), |v| v.name.as_str());
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{voice}", voice)
                    .replace("{locale}", &utterance.locale)
                    .replace("{rate}", &utterance.rate.to_string())
                    .replace("{pitch}", &utterance.pitch.to_string())
                    .replace("{volume}", &utterance.volume.to_string())
            })
            .collect()
    }
}

#[async_trait]
impl PlaybackEngine for CommandPlaybackEngine {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    async fn speak(&self, utterance: &Utterance) -> Result<(), PlaybackFailure> {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.expand_args(utterance))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| PlaybackFailure(format!("Failed to spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A synthesizer that exits early closes the pipe; its exit status
            // is the error worth reporting
            if let Err(e) = stdin.write_all(utterance.text.as_bytes()).await {
                tracing::debug!(program = %self.program, error = %e, "Failed to write utterance");
            }
            // Close stdin so the synthesizer sees end of input
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PlaybackFailure(format!("Synthesizer failed: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let exit_code = output.status.code().unwrap_or(-1);
            Err(PlaybackFailure(format!(
                "{} exited with code {exit_code}: {}",
                self.program,
                stderr.trim()
            )))
        }
    }
}
