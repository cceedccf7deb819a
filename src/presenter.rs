//! Terminal presentation of the conversation

use crate::conversation::{Message, Sender};
use crate::runtime::Presenter;
use crate::state_machine::ConversationState;
use chrono::Local;
use std::io::Write;

/// Status line text for each conversation state
pub fn status_text(state: ConversationState) -> &'static str {
    match state {
        ConversationState::Disconnected => "Disconnected - Reconnecting...",
        ConversationState::Ready => "Ready to chat",
        ConversationState::Listening => "Listening... Speak now",
        ConversationState::Processing => "Processing your message...",
        ConversationState::Speaking => "AI is speaking...",
    }
}

/// Prints the conversation to any writer, stdout by default
pub struct TerminalPresenter<W: Write + Send = std::io::Stdout> {
    out: W,
    muted: bool,
}

impl TerminalPresenter {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out, muted: false }
    }

    fn line(&mut self, text: &str) {
        // A closed terminal is not worth failing the turn over
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "Failed to write to terminal");
        }
    }
}

impl<W: Write + Send> Presenter for TerminalPresenter<W> {
    fn render(&mut self, message: &Message) {
        let time = message.timestamp().with_timezone(&Local).format("%H:%M:%S");
        if message.is_error() {
            // Error entries carry their own marker
            self.line(&format!("[{time}] {}", message.text()));
            return;
        }
        let who = match message.sender() {
            Sender::User => "You",
            Sender::Agent => "Agent",
        };
        self.line(&format!("[{time}] {who}: {}", message.text()));
    }

    fn render_error(&mut self, text: &str) {
        self.line(&format!("! {text}"));
    }

    fn set_visual_state(&mut self, state: ConversationState) {
        let mute = if self.muted { " (muted)" } else { "" };
        let hint = if state.accepts_capture_toggle() {
            "  [Enter to talk]"
        } else {
            ""
        };
        self.line(&format!("-- {}{mute}{hint}", status_text(state)));
    }

    fn set_muted(&mut self, muted: bool) {
        if self.muted != muted {
            self.muted = muted;
            self.line(if muted { "-- Speech muted" } else { "-- Speech unmuted" });
        }
    }

    fn clear(&mut self) {
        // ANSI clear screen and home the cursor
        self.line("\x1b[2J\x1b[H-- Conversation reset");
    }
}
