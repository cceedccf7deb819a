//! Conversation state types

use crate::locale::LanguagePreference;
use serde::{Deserialize, Serialize};

/// Whose turn it is, as shown to the user.
///
/// Exactly one value holds at any instant. `Listening` implies an active
/// capture attempt and `Speaking` an active utterance; the coordinator never
/// lets the two subsystems run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// Channel closed or not yet open
    #[default]
    Disconnected,
    /// Connected and idle
    Ready,
    /// Capturing the user's utterance
    Listening,
    /// Transcript sent, waiting for the agent
    Processing,
    /// Playing the agent's reply
    Speaking,
}

impl ConversationState {
    /// Check if the user may start or stop a capture in this state
    pub fn accepts_capture_toggle(self) -> bool {
        matches!(self, Self::Ready | Self::Listening)
    }

    pub fn is_connected(self) -> bool {
        self != Self::Disconnected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Ready => "ready",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the transition function reads and writes.
///
/// Owned by a single [`TurnCoordinator`](super::TurnCoordinator); the other
/// components only ever see copies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnState {
    pub conversation: ConversationState,
    /// Replies are logged but not spoken while set
    pub muted: bool,
    pub language: LanguagePreference,
    /// Id of the most recent capture activation
    pub activation: u64,
    /// Id of the most recent utterance handed to playback
    pub utterance: u64,
}

impl TurnState {
    pub fn new(muted: bool, language: LanguagePreference) -> Self {
        Self {
            muted,
            language,
            ..Self::default()
        }
    }

    /// State to fall back to once a turn ends
    pub fn idle(&self) -> ConversationState {
        if self.conversation.is_connected() {
            ConversationState::Ready
        } else {
            ConversationState::Disconnected
        }
    }
}
