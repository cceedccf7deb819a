//! Events that can occur in a conversation

use crate::capture::CaptureErrorKind;
use crate::channel::envelope::InboundEnvelope;
use crate::channel::ChannelError;

/// Events that trigger state transitions.
///
/// Capture and playback signals carry the id the coordinator assigned when
/// it requested the attempt, so late callbacks from an abandoned attempt can
/// be told apart from the current one.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Channel events
    ChannelOpen,
    ChannelClosed,
    Inbound(InboundEnvelope),
    /// Inbound payload that could not be decoded
    ProtocolError {
        detail: String,
    },
    /// An outbound envelope could not be handed to the channel
    SendFailed {
        error: ChannelError,
    },

    // Capture events
    CaptureStarted {
        activation: u64,
    },
    Transcript {
        activation: u64,
        text: String,
    },
    CaptureError {
        activation: u64,
        kind: CaptureErrorKind,
    },

    // Playback events
    PlaybackStarted {
        utterance: u64,
    },
    PlaybackEnded {
        utterance: u64,
    },
    PlaybackError {
        utterance: u64,
        detail: String,
    },

    // User events
    ToggleCapture,
    Reset,
    ToggleMute,
}

impl Event {
    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Event::ChannelOpen => "channel_open",
            Event::ChannelClosed => "channel_closed",
            Event::Inbound(InboundEnvelope::AgentResponse { .. }) => "agent_response",
            Event::Inbound(InboundEnvelope::Error { .. }) => "remote_error",
            Event::Inbound(InboundEnvelope::Unknown { .. }) => "unknown_envelope",
            Event::ProtocolError { .. } => "protocol_error",
            Event::SendFailed { .. } => "send_failed",
            Event::CaptureStarted { .. } => "capture_started",
            Event::Transcript { .. } => "transcript",
            Event::CaptureError { .. } => "capture_error",
            Event::PlaybackStarted { .. } => "playback_started",
            Event::PlaybackEnded { .. } => "playback_ended",
            Event::PlaybackError { .. } => "playback_error",
            Event::ToggleCapture => "toggle_capture",
            Event::Reset => "reset",
            Event::ToggleMute => "toggle_mute",
        }
    }
}
