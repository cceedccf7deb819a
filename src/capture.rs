//! Speech capture
//!
//! [`SpeechCaptureSession`] wraps a [`CaptureEngine`] and turns each
//! activation into exactly one outcome event on the runtime's event channel.

mod terminal;

pub use terminal::{terminal_capture, TerminalInput};

use crate::state_machine::Event;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// How a capture failure is reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// Microphone access refused - the user has to act on this
    PermissionDenied,
    /// Every other engine failure
    Generic,
}

impl CaptureErrorKind {
    /// Classify an engine-specific error code
    pub fn from_engine_code(code: &str) -> Self {
        match code {
            "permission-denied" | "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            _ => Self::Generic,
        }
    }

    pub fn user_message(self) -> &'static str {
        match self {
            Self::PermissionDenied => {
                "Microphone access denied. Please allow microphone access and try again."
            }
            Self::Generic => "Speech recognition error. Please try again.",
        }
    }
}

/// Capture engine error with classification
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CaptureFailure {
    pub kind: CaptureErrorKind,
    pub message: String,
}

impl CaptureFailure {
    pub fn new(kind: CaptureErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify an engine error code such as `"not-allowed"` or `"network"`
    pub fn from_engine_code(code: &str, message: impl Into<String>) -> Self {
        Self::new(CaptureErrorKind::from_engine_code(code), message)
    }
}

/// Speech-to-text capability
#[async_trait]
pub trait CaptureEngine: Send + Sync {
    /// Listen for a single utterance and return its transcript.
    ///
    /// The future is dropped when the attempt is abandoned, so engines must
    /// release their input on drop.
    async fn listen(&self, locale: &str) -> Result<String, CaptureFailure>;
}

struct ActiveCapture {
    activation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// One capture attempt at a time over a [`CaptureEngine`]
pub struct SpeechCaptureSession<C: CaptureEngine + ?Sized + 'static> {
    engine: Arc<C>,
    event_tx: mpsc::Sender<Event>,
    timeout: Duration,
    active: Option<ActiveCapture>,
}

impl<C: CaptureEngine + ?Sized + 'static> SpeechCaptureSession<C> {
    pub fn new(engine: Arc<C>, event_tx: mpsc::Sender<Event>, timeout: Duration) -> Self {
        Self {
            engine,
            event_tx,
            timeout,
            active: None,
        }
    }

    /// Start a capture attempt.
    ///
    /// Emits `CaptureStarted`, then exactly one of `Transcript` or
    /// `CaptureError`, unless [`Self::deactivate`] is called first.
    pub fn activate(&mut self, activation: u64, locale: String) {
        self.deactivate();

        let cancel = CancellationToken::new();
        let engine = self.engine.clone();
        let event_tx = self.event_tx.clone();
        let timeout = self.timeout;
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::debug!(activation, locale = %locale, "Capture started");
            if event_tx
                .send(Event::CaptureStarted { activation })
                .await
                .is_err()
            {
                return;
            }

            let outcome = tokio::select! {
                biased;

                () = token.cancelled() => {
                    tracing::debug!(activation, "Capture cancelled");
                    return;
                }

                outcome = tokio::time::timeout(timeout, engine.listen(&locale)) => outcome,
            };

            let event = match outcome {
                Ok(Ok(transcript)) if !transcript.trim().is_empty() => Event::Transcript {
                    activation,
                    text: transcript.trim().to_string(),
                },
                Ok(Ok(_)) => {
                    tracing::info!(activation, "No speech detected");
                    Event::CaptureError {
                        activation,
                        kind: CaptureErrorKind::Generic,
                    }
                }
                Ok(Err(failure)) => {
                    tracing::warn!(activation, kind = ?failure.kind, error = %failure, "Speech recognition error");
                    Event::CaptureError {
                        activation,
                        kind: failure.kind,
                    }
                }
                Err(_) => {
                    tracing::warn!(activation, timeout_secs = timeout.as_secs(), "Capture timed out");
                    Event::CaptureError {
                        activation,
                        kind: CaptureErrorKind::Generic,
                    }
                }
            };

            // Deactivated while the engine was finishing: suppress the result
            if token.is_cancelled() {
                return;
            }
            let _ = event_tx.send(event).await;
        });

        self.active = Some(ActiveCapture {
            activation,
            cancel,
            task,
        });
    }

    /// Abandon the current attempt. Safe to call when nothing is active.
    pub fn deactivate(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(activation = active.activation, "Deactivating capture");
            active.cancel.cancel();
        }
    }

    /// Check if a capture attempt is still running
    #[allow(dead_code)] // Used by tests
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| !a.cancel.is_cancelled() && !a.task.is_finished())
    }
}

impl<C: CaptureEngine + ?Sized + 'static> Drop for SpeechCaptureSession<C> {
    fn drop(&mut self) {
        self.deactivate();
    }
}
