//! Speech playback
//!
//! [`SpeechPlaybackQueue`] keeps at most one utterance audible and reports
//! its lifecycle on the runtime's event channel.

mod engines;
mod voice;

pub use engines::{CommandPlaybackEngine, PrintPlaybackEngine};
pub use voice::{select_voice, Voice};

use crate::locale::LanguagePreference;
use crate::state_machine::Event;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A single thing to say
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub locale: String,
    /// `None` leaves the choice to the engine
    pub voice: Option<Voice>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            locale: locale.into(),
            voice: None,
            rate: 0.9,
            pitch: 1.0,
            volume: 0.8,
        }
    }
}

/// Playback engine error
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PlaybackFailure(pub String);

/// Text-to-speech capability
#[async_trait]
pub trait PlaybackEngine: Send + Sync {
    /// Voices the engine offers
    fn voices(&self) -> Vec<Voice>;

    /// Speak an utterance to completion.
    ///
    /// The future is dropped to cancel, so engines must stop audio on drop.
    async fn speak(&self, utterance: &Utterance) -> Result<(), PlaybackFailure>;
}

struct ActiveUtterance {
    utterance: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// One audible utterance at a time over a [`PlaybackEngine`]
pub struct SpeechPlaybackQueue<P: PlaybackEngine + ?Sized + 'static> {
    engine: Arc<P>,
    event_tx: mpsc::Sender<Event>,
    timeout: Duration,
    current: Option<ActiveUtterance>,
}

impl<P: PlaybackEngine + ?Sized + 'static> SpeechPlaybackQueue<P> {
    pub fn new(engine: Arc<P>, event_tx: mpsc::Sender<Event>, timeout: Duration) -> Self {
        Self {
            engine,
            event_tx,
            timeout,
            current: None,
        }
    }

    /// Cancel whatever is playing and start speaking `text`.
    ///
    /// Emits `PlaybackStarted`, then exactly one of `PlaybackEnded` or
    /// `PlaybackError`. A cancelled utterance emits nothing further.
    pub fn speak(&mut self, utterance: u64, text: String, language: &LanguagePreference) {
        self.cancel_all();

        let mut request = Utterance::new(text, language.locale());
        request.voice = select_voice(&self.engine.voices(), &request.locale);
        if let Some(voice) = &request.voice {
            tracing::debug!(utterance, voice = %voice.name, "Selected voice");
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let engine = self.engine.clone();
        let event_tx = self.event_tx.clone();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            if event_tx
                .send(Event::PlaybackStarted { utterance })
                .await
                .is_err()
            {
                return;
            }

            let outcome = tokio::select! {
                biased;

                () = token.cancelled() => {
                    tracing::debug!(utterance, "Playback cancelled");
                    return;
                }

                outcome = tokio::time::timeout(timeout, engine.speak(&request)) => outcome,
            };

            let event = match outcome {
                Ok(Ok(())) => Event::PlaybackEnded { utterance },
                Ok(Err(failure)) => {
                    tracing::warn!(utterance, error = %failure, "Speech synthesis error");
                    Event::PlaybackError {
                        utterance,
                        detail: failure.to_string(),
                    }
                }
                Err(_) => {
                    tracing::warn!(utterance, timeout_secs = timeout.as_secs(), "Playback timed out");
                    Event::PlaybackError {
                        utterance,
                        detail: "playback timed out".to_string(),
                    }
                }
            };

            if token.is_cancelled() {
                return;
            }
            let _ = event_tx.send(event).await;
        });

        self.current = Some(ActiveUtterance {
            utterance,
            cancel,
            task,
        });
    }

    /// Silence playback. Idempotent, and safe when nothing is playing.
    pub fn cancel_all(&mut self) {
        if let Some(current) = self.current.take() {
            tracing::debug!(utterance = current.utterance, "Cancelling playback");
            current.cancel.cancel();
        }
    }

    /// Check if an utterance is still playing
    #[allow(dead_code)] // Used by tests
    pub fn is_active(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| !c.cancel.is_cancelled() && !c.task.is_finished())
    }
}

impl<P: PlaybackEngine + ?Sized + 'static> Drop for SpeechPlaybackQueue<P> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
