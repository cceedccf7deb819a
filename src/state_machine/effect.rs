//! Effects produced by state transitions

use super::ConversationState;
use crate::channel::envelope::OutboundEnvelope;
use crate::conversation::{Message, Sender, ERROR_PREFIX};
use crate::locale::LanguagePreference;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation log.
    /// The coordinator stamps it and replaces it with [`Effect::Render`].
    LogMessage { sender: Sender, text: String },

    /// Show a message that was just appended to the log
    Render(Message),

    /// Empty the log and the display
    ClearLog,

    /// Hand an envelope to the channel
    Send(OutboundEnvelope),

    /// Begin a single capture attempt
    StartCapture {
        activation: u64,
        language: LanguagePreference,
    },

    /// Abandon the current capture attempt, suppressing its transcript
    StopCapture,

    /// Speak a reply, replacing any current utterance
    Speak {
        utterance: u64,
        text: String,
        language: LanguagePreference,
    },

    /// Silence playback (no-op when nothing is playing)
    CancelPlayback,

    /// Put an error on the status line
    ShowError { text: String },

    /// Notify the presentation layer of the new conversation state
    SetVisualState(ConversationState),

    /// Notify the presentation layer of the mute flag
    SetMuted(bool),
}

impl Effect {
    pub fn log_user(text: impl Into<String>) -> Self {
        Effect::LogMessage {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn log_agent(text: impl Into<String>) -> Self {
        Effect::LogMessage {
            sender: Sender::Agent,
            text: text.into(),
        }
    }

    /// Agent-attributed log entry marked as an error
    pub fn log_error(text: &str) -> Self {
        Effect::log_agent(format!("{ERROR_PREFIX}{text}"))
    }

    pub fn show_error(text: impl Into<String>) -> Self {
        Effect::ShowError { text: text.into() }
    }
}
