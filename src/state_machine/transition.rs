//! Pure state transition function
//!
//! Given the same state and event this always produces the same result and
//! performs no I/O. Subsystem callbacks that arrive for an attempt the
//! coordinator already abandoned are rejected with [`TransitionError::Stale`].

use super::{ConversationState, Effect, Event, TurnState};
use crate::channel::envelope::{InboundEnvelope, OutboundEnvelope};
use crate::locale::LanguagePreference;
use thiserror::Error;

pub const PROTOCOL_ERROR_MESSAGE: &str = "Received a malformed message from the server";
pub const PLAYBACK_ERROR_MESSAGE: &str = "Could not play the response aloud";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: TurnState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: TurnState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Reasons an event leaves the state untouched
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Cannot start a new turn while {0}")]
    Busy(ConversationState),
    #[error("Not connected to server")]
    NotConnected,
    #[error("Stale {signal} for attempt {id} (current attempt {current})")]
    Stale {
        signal: &'static str,
        id: u64,
        current: u64,
    },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
#[allow(clippy::too_many_lines)] // One arm per row of the turn-taking table
pub fn transition(state: &TurnState, event: Event) -> Result<TransitionResult, TransitionError> {
    use ConversationState as S;

    match (state.conversation, event) {
        // ============================================================
        // Connection lifecycle
        // ============================================================
        (S::Disconnected, Event::ChannelOpen) => Ok(TransitionResult::new(enter(state, S::Ready))),

        (_, Event::ChannelOpen) => Err(TransitionError::InvalidTransition(
            "channel is already open".to_string(),
        )),

        (S::Disconnected, Event::ChannelClosed) => Err(TransitionError::InvalidTransition(
            "channel is already closed".to_string(),
        )),

        // No log entry is fabricated for a turn the closure interrupted
        (current, Event::ChannelClosed) => Ok(TransitionResult::new(enter(state, S::Disconnected))
            .with_effects(abort_subsystems(current))),

        (current, Event::SendFailed { error }) => {
            let text = error.to_string();
            Ok(TransitionResult::new(enter(state, S::Disconnected))
                .with_effects(abort_subsystems(current))
                .with_effect(Effect::log_error(&text))
                .with_effect(Effect::show_error(text)))
        }

        // ============================================================
        // Capture toggle
        // ============================================================
        (S::Ready, Event::ToggleCapture) => {
            let mut next = enter(state, S::Listening);
            next.activation += 1;
            let start = Effect::StartCapture {
                activation: next.activation,
                language: next.language.clone(),
            };
            Ok(TransitionResult::new(next).with_effect(start))
        }

        (S::Listening, Event::ToggleCapture) => {
            Ok(TransitionResult::new(enter(state, S::Ready)).with_effect(Effect::StopCapture))
        }

        (S::Disconnected, Event::ToggleCapture) => Err(TransitionError::NotConnected),

        // Processing/Speaking: the user cannot start a turn mid-turn
        (current, Event::ToggleCapture) => Err(TransitionError::Busy(current)),

        // ============================================================
        // Capture signals
        // ============================================================
        (S::Listening, Event::CaptureStarted { activation }) if activation == state.activation => {
            Ok(TransitionResult::new(state.clone()))
        }

        (S::Listening, Event::Transcript { activation, text }) if activation == state.activation => {
            Ok(TransitionResult::new(enter(state, S::Processing))
                .with_effect(Effect::log_user(text.clone()))
                .with_effect(Effect::Send(OutboundEnvelope::user_message(text))))
        }

        (S::Listening, Event::CaptureError { activation, kind }) if activation == state.activation => {
            let message = kind.user_message();
            Ok(TransitionResult::new(enter(state, S::Ready))
                .with_effect(Effect::log_error(message))
                .with_effect(Effect::show_error(message)))
        }

        (
            _,
            Event::CaptureStarted { activation }
            | Event::Transcript { activation, .. }
            | Event::CaptureError { activation, .. },
        ) => Err(TransitionError::Stale {
            signal: "capture signal",
            id: activation,
            current: state.activation,
        }),

        // ============================================================
        // Inbound envelopes
        // ============================================================
        (S::Disconnected, Event::Inbound(_)) => Err(TransitionError::InvalidTransition(
            "inbound envelope while disconnected".to_string(),
        )),

        (current, Event::Inbound(InboundEnvelope::AgentResponse { text, language })) => {
            Ok(agent_response(state, current, text, language))
        }

        // A remote error ends the turn whatever state we are in
        (current, Event::Inbound(InboundEnvelope::Error { text })) => {
            Ok(TransitionResult::new(enter(state, S::Ready))
                .with_effects(abort_subsystems(current))
                .with_effect(Effect::log_error(&text))
                .with_effect(Effect::show_error(text)))
        }

        (_, Event::Inbound(InboundEnvelope::Unknown { kind })) => Err(
            TransitionError::InvalidTransition(format!("unknown envelope kind `{kind}`")),
        ),

        (current, Event::ProtocolError { .. }) => Ok(TransitionResult::new(enter(state, state.idle()))
            .with_effects(abort_subsystems(current))
            .with_effect(Effect::log_error(PROTOCOL_ERROR_MESSAGE))
            .with_effect(Effect::show_error(PROTOCOL_ERROR_MESSAGE))),

        // ============================================================
        // Playback signals
        // ============================================================
        (S::Speaking, Event::PlaybackStarted { utterance }) if utterance == state.utterance => {
            Ok(TransitionResult::new(state.clone()))
        }

        (S::Speaking, Event::PlaybackEnded { utterance }) if utterance == state.utterance => {
            Ok(TransitionResult::new(enter(state, S::Ready)))
        }

        (S::Speaking, Event::PlaybackError { utterance, .. }) if utterance == state.utterance => {
            Ok(TransitionResult::new(enter(state, S::Ready))
                .with_effect(Effect::log_error(PLAYBACK_ERROR_MESSAGE))
                .with_effect(Effect::show_error(PLAYBACK_ERROR_MESSAGE)))
        }

        (
            _,
            Event::PlaybackStarted { utterance }
            | Event::PlaybackEnded { utterance }
            | Event::PlaybackError { utterance, .. },
        ) => Err(TransitionError::Stale {
            signal: "playback signal",
            id: utterance,
            current: state.utterance,
        }),

        // ============================================================
        // Mute and reset (accepted in every state)
        // ============================================================
        (current, Event::ToggleMute) => {
            let mut next = state.clone();
            next.muted = !state.muted;
            let result = TransitionResult::new(next).with_effect(Effect::SetMuted(!state.muted));

            if !state.muted && current == S::Speaking {
                let mut result = result.with_effect(Effect::CancelPlayback);
                result.new_state.conversation = S::Ready;
                Ok(result)
            } else {
                Ok(result)
            }
        }

        (current, Event::Reset) => {
            let mut result = TransitionResult::new(enter(state, state.idle()))
                .with_effect(Effect::ClearLog)
                .with_effect(Effect::CancelPlayback);
            if current == S::Listening {
                result = result.with_effect(Effect::StopCapture);
            }
            if current.is_connected() {
                result = result.with_effect(Effect::Send(OutboundEnvelope::ResetConversation));
            }
            Ok(result)
        }
    }
}

// Helper functions

fn enter(state: &TurnState, conversation: ConversationState) -> TurnState {
    TurnState {
        conversation,
        ..state.clone()
    }
}

/// Effects that stop whichever subsystem the current state has running
fn abort_subsystems(current: ConversationState) -> Vec<Effect> {
    match current {
        ConversationState::Listening => vec![Effect::StopCapture],
        ConversationState::Speaking => vec![Effect::CancelPlayback],
        _ => vec![],
    }
}

fn agent_response(
    state: &TurnState,
    current: ConversationState,
    text: String,
    language: Option<String>,
) -> TransitionResult {
    let mut next = state.clone();
    if let Some(tag) = language.filter(|tag| state.language.differs_from(tag)) {
        next.language = LanguagePreference::new(tag);
    }
    let log = Effect::log_agent(text.clone());

    match current {
        // Never speak over the user; the reply is still recorded
        ConversationState::Listening => TransitionResult::new(next).with_effect(log),
        _ if state.muted => {
            next.conversation = ConversationState::Ready;
            TransitionResult::new(next).with_effect(log)
        }
        _ => {
            next.conversation = ConversationState::Speaking;
            next.utterance += 1;
            let speak = Effect::Speak {
                utterance: next.utterance,
                text,
                language: next.language.clone(),
            };
            TransitionResult::new(next).with_effect(log).with_effect(speak)
        }
    }
}
