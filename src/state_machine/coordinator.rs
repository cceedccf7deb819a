//! Single owner of the conversation state and log

use super::{transition, ConversationState, Effect, Event, TurnState};
use crate::conversation::{ConversationLog, Message};
use crate::locale::LanguagePreference;
use chrono::Utc;

/// Owns the one live [`TurnState`] and the [`ConversationLog`].
///
/// Every event goes through [`TurnCoordinator::handle`], which runs the pure
/// transition, commits the new state, applies log effects and returns the
/// effects the runtime still has to carry out. Nothing else mutates the
/// state or the mute flag.
#[derive(Debug, Default)]
pub struct TurnCoordinator {
    state: TurnState,
    log: ConversationLog,
}

impl TurnCoordinator {
    pub fn new(state: TurnState) -> Self {
        Self {
            state,
            log: ConversationLog::new(),
        }
    }

    pub fn state(&self) -> ConversationState {
        self.state.conversation
    }

    pub fn turn_state(&self) -> &TurnState {
        &self.state
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn is_muted(&self) -> bool {
        self.state.muted
    }

    pub fn language(&self) -> &LanguagePreference {
        &self.state.language
    }

    /// Process one event and return the effects to execute, in order
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let event_name = event.name();

        let result = match transition(&self.state, event) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(event = event_name, state = %self.state.conversation, reason = %e, "Event ignored");
                return vec![];
            }
        };

        let previous = self.state.conversation;
        self.state = result.new_state;

        let mut effects = Vec::with_capacity(result.effects.len() + 1);
        if previous != self.state.conversation {
            tracing::info!(
                event = event_name,
                from = %previous,
                to = %self.state.conversation,
                "Conversation state changed"
            );
            effects.push(Effect::SetVisualState(self.state.conversation));
        }

        for effect in result.effects {
            match effect {
                Effect::LogMessage { sender, text } => {
                    let message = Message::new(sender, text, Utc::now());
                    self.log.append(message.clone());
                    effects.push(Effect::Render(message));
                }
                Effect::ClearLog => {
                    self.log.clear();
                    effects.push(Effect::ClearLog);
                }
                other => effects.push(other),
            }
        }

        effects
    }
}
