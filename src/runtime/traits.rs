//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::channel::envelope::OutboundEnvelope;
use crate::channel::{ChannelError, ChannelHandle};
use crate::conversation::Message;
use crate::state_machine::ConversationState;
use std::sync::Arc;

/// Destination for outbound envelopes
pub trait EnvelopeSink: Send + Sync {
    /// Hand an envelope to the transport without waiting for delivery
    fn send(&self, envelope: &OutboundEnvelope) -> Result<(), ChannelError>;
}

/// Presentation surface for the conversation
pub trait Presenter: Send {
    /// Show a message that was just appended to the log
    fn render(&mut self, message: &Message);

    /// Put an error on the status line
    fn render_error(&mut self, text: &str);

    fn set_visual_state(&mut self, state: ConversationState);

    fn set_muted(&mut self, muted: bool);

    /// Remove every rendered message
    fn clear(&mut self);
}

impl EnvelopeSink for ChannelHandle {
    fn send(&self, envelope: &OutboundEnvelope) -> Result<(), ChannelError> {
        ChannelHandle::send(self, envelope)
    }
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

impl<T: EnvelopeSink + ?Sized> EnvelopeSink for Arc<T> {
    fn send(&self, envelope: &OutboundEnvelope) -> Result<(), ChannelError> {
        (**self).send(envelope)
    }
}
