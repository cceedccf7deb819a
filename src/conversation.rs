//! Conversation log
//!
//! Append-only record of the messages exchanged in the current session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix marking agent-attributed entries that report a failure
pub const ERROR_PREFIX: &str = "❌ Error: ";

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Agent,
}

/// A single exchanged message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    sender: Sender,
    text: String,
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender,
            text: text.into(),
            timestamp,
        }
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Whether this entry records an error rather than agent speech
    pub fn is_error(&self) -> bool {
        self.sender == Sender::Agent && self.text.starts_with(ERROR_PREFIX)
    }
}

/// Ordered, append-only sequence of messages.
///
/// Entries are never reordered or mutated; the only way to remove anything
/// is [`ConversationLog::clear`], used by a conversation reset.
#[derive(Debug, Clone, Default)]
pub struct ConversationLog {
    entries: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Messages in insertion order. The iterator is `Clone`, so a renderer
    /// can walk it more than once.
    pub fn entries(&self) -> impl Iterator<Item = &Message> + Clone + '_ {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
