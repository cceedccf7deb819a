//! Voice chat runtime executor

use super::traits::{EnvelopeSink, Presenter};

use crate::capture::{CaptureEngine, SpeechCaptureSession};
use crate::playback::{PlaybackEngine, SpeechPlaybackQueue};
use crate::state_machine::{Effect, Event, TurnCoordinator};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Generic runtime that can work with any sink, presenter and engines
pub struct VoiceChatRuntime<S, P, C, E>
where
    S: EnvelopeSink,
    P: Presenter,
    C: CaptureEngine + ?Sized + 'static,
    E: PlaybackEngine + ?Sized + 'static,
{
    coordinator: TurnCoordinator,
    sink: S,
    presenter: P,
    capture: SpeechCaptureSession<C>,
    playback: SpeechPlaybackQueue<E>,
    event_rx: mpsc::Receiver<Event>,
    shutdown: CancellationToken,
}

impl<S, P, C, E> VoiceChatRuntime<S, P, C, E>
where
    S: EnvelopeSink,
    P: Presenter,
    C: CaptureEngine + ?Sized + 'static,
    E: PlaybackEngine + ?Sized + 'static,
{
    pub fn new(
        coordinator: TurnCoordinator,
        sink: S,
        presenter: P,
        capture: SpeechCaptureSession<C>,
        playback: SpeechPlaybackQueue<E>,
        event_rx: mpsc::Receiver<Event>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            coordinator,
            sink,
            presenter,
            capture,
            playback,
            event_rx,
            shutdown,
        }
    }

    /// Process events until shutdown or until every sender is gone.
    ///
    /// Returns the coordinator so callers can inspect the final state and log.
    pub async fn run(mut self) -> TurnCoordinator {
        tracing::info!(
            state = %self.coordinator.state(),
            muted = self.coordinator.is_muted(),
            language = self.coordinator.language().tag(),
            "Starting voice chat runtime"
        );
        self.presenter.set_visual_state(self.coordinator.state());
        self.presenter.set_muted(self.coordinator.is_muted());

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => break,
                },
            }
        }

        self.capture.deactivate();
        self.playback.cancel_all();
        tracing::info!(state = %self.coordinator.state(), "Voice chat runtime stopped");
        self.coordinator
    }

    /// Handle one event and every follow-up event its effects produce,
    /// before anything else is read off the channel
    fn process_event(&mut self, event: Event) {
        let mut pending = VecDeque::from([event]);

        while let Some(event) = pending.pop_front() {
            tracing::debug!(event = event.name(), state = %self.coordinator.state(), "Processing event");
            for effect in self.coordinator.handle(event) {
                if let Some(follow_up) = self.execute_effect(effect) {
                    pending.push_back(follow_up);
                }
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Render(message) => {
                self.presenter.render(&message);
            }

            Effect::ClearLog => {
                self.presenter.clear();
            }

            Effect::Send(envelope) => {
                if let Err(error) = self.sink.send(&envelope) {
                    tracing::warn!(kind = envelope.kind(), error = %error, "Failed to send envelope");
                    return Some(Event::SendFailed { error });
                }
            }

            Effect::StartCapture {
                activation,
                language,
            } => {
                self.capture.activate(activation, language.locale());
            }

            Effect::StopCapture => {
                self.capture.deactivate();
            }

            Effect::Speak {
                utterance,
                text,
                language,
            } => {
                self.playback.speak(utterance, text, &language);
            }

            Effect::CancelPlayback => {
                self.playback.cancel_all();
            }

            Effect::ShowError { text } => {
                self.presenter.render_error(&text);
            }

            Effect::SetVisualState(state) => {
                self.presenter.set_visual_state(state);
            }

            Effect::SetMuted(muted) => {
                self.presenter.set_muted(muted);
            }

            Effect::LogMessage { .. } => {
                // The coordinator stamps these into Render effects
                tracing::warn!("Unstamped log effect reached the runtime");
            }
        }
        None
    }
}
