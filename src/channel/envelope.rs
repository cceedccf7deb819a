//! Wire envelopes exchanged with the remote agent
//!
//! Every payload is a JSON object tagged by `type`. Outbound and inbound
//! kinds are separate enums so the compiler keeps us from sending an
//! inbound-only kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Envelopes the client sends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEnvelope {
    UserMessage {
        #[serde(rename = "message")]
        text: String,
    },
    ResetConversation,
}

impl OutboundEnvelope {
    pub fn user_message(text: impl Into<String>) -> Self {
        Self::UserMessage { text: text.into() }
    }

    pub fn encode(&self) -> String {
        // A two-variant enum of strings always serializes
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::UserMessage { .. } => "user_message",
            Self::ResetConversation => "reset_conversation",
        }
    }
}

/// Envelopes the remote agent sends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEnvelope {
    AgentResponse {
        text: String,
        language: Option<String>,
    },
    Error {
        text: String,
    },
    /// Well-formed envelope of a kind this client does not know.
    /// Kept so newer agents can add kinds without breaking older clients.
    Unknown {
        kind: String,
    },
}

/// Inbound payload that could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("payload is not an object with a string `type` field")]
    MissingType,
    #[error("malformed `{kind}` envelope: {reason}")]
    Malformed { kind: String, reason: String },
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KnownInbound {
    AgentResponse {
        message: String,
        #[serde(default)]
        language: Option<String>,
    },
    Error {
        message: String,
    },
}

impl InboundEnvelope {
    /// Decode a text frame received from the agent
    pub fn decode(payload: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(EnvelopeError::MissingType)?
            .to_string();

        if !matches!(kind.as_str(), "agent_response" | "error") {
            return Ok(Self::Unknown { kind });
        }

        let known: KnownInbound =
            serde_json::from_value(value).map_err(|e| EnvelopeError::Malformed {
                kind: kind.clone(),
                reason: e.to_string(),
            })?;

        Ok(match known {
            KnownInbound::AgentResponse { message, language } => Self::AgentResponse {
                text: message,
                // An empty language field carries no preference
                language: language.filter(|l| !l.trim().is_empty()),
            },
            KnownInbound::Error { message } => Self::Error { text: message },
        })
    }
}
