//! Typed-input capture engine for terminal hosts

use super::{CaptureEngine, CaptureFailure};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Error code reported when the input stream is gone
const INPUT_CLOSED_CODE: &str = "audio-capture";

/// A typed line, tagged with the number of talk requests made before it
#[derive(Debug)]
struct TypedLine {
    talk: u64,
    text: String,
}

#[derive(Debug, Default)]
struct TalkGate {
    /// Talk requests routed so far
    requested: AtomicU64,
    /// Talk count claimed by the most recent capture attempt
    claimed: AtomicU64,
    listening: AtomicBool,
}

/// Clears the listening flag when a capture attempt ends or is dropped
struct ListeningGuard<'a>(&'a TalkGate);

impl<'a> ListeningGuard<'a> {
    fn new(gate: &'a TalkGate) -> Self {
        gate.listening.store(true, Ordering::Release);
        Self(gate)
    }
}

impl Drop for ListeningGuard<'_> {
    fn drop(&mut self) {
        self.0.listening.store(false, Ordering::Release);
    }
}

/// Writer half of the terminal capture pair
#[derive(Debug, Clone)]
pub struct TerminalInput {
    lines: mpsc::Sender<TypedLine>,
    gate: Arc<TalkGate>,
}

impl TerminalInput {
    /// Record a talk request. Call before the matching `ToggleCapture` is sent.
    pub fn talk_requested(&self) {
        self.gate.requested.fetch_add(1, Ordering::AcqRel);
    }

    /// Whether a capture attempt is running or a talk request is still
    /// waiting for one
    pub fn awaiting_speech(&self) -> bool {
        self.gate.listening.load(Ordering::Acquire)
            || self.gate.requested.load(Ordering::Acquire)
                > self.gate.claimed.load(Ordering::Acquire)
    }

    /// Queue a line for capture. Fails once the engine is dropped.
    pub async fn send(&self, text: String) -> Result<(), mpsc::error::SendError<String>> {
        let talk = self.gate.requested.load(Ordering::Acquire);
        self.lines
            .send(TypedLine { talk, text })
            .await
            .map_err(|e| mpsc::error::SendError(e.0.text))
    }
}

/// Treats the next line the user types as the spoken transcript.
///
/// A line only counts for a capture if it was typed after the talk request
/// that started it. Older lines are dropped when the capture reads them.
pub struct TerminalCaptureEngine {
    lines: Mutex<mpsc::Receiver<TypedLine>>,
    gate: Arc<TalkGate>,
}

/// Build a connected input/engine pair
pub fn terminal_capture(capacity: usize) -> (TerminalInput, TerminalCaptureEngine) {
    let (tx, rx) = mpsc::channel(capacity);
    let gate = Arc::new(TalkGate::default());
    let input = TerminalInput {
        lines: tx,
        gate: gate.clone(),
    };
    let engine = TerminalCaptureEngine {
        lines: Mutex::new(rx),
        gate,
    };
    (input, engine)
}

#[async_trait]
impl CaptureEngine for TerminalCaptureEngine {
    async fn listen(&self, locale: &str) -> Result<String, CaptureFailure> {
        let mut lines = self.lines.lock().await;

        let talk = self.gate.requested.load(Ordering::Acquire);
        self.gate.claimed.store(talk, Ordering::Release);
        let _listening = ListeningGuard::new(&self.gate);

        tracing::debug!(locale, talk, "Waiting for typed utterance");
        while let Some(line) = lines.recv().await {
            if line.talk >= talk {
                return Ok(line.text);
            }
            tracing::debug!(line_talk = line.talk, talk, "Discarded input typed outside a capture");
        }

        Err(CaptureFailure::from_engine_code(INPUT_CLOSED_CODE, "input closed"))
    }
}
