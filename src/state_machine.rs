//! Conversation turn-taking state machine
//!
//! Implements the Elm Architecture pattern: a pure [`transition`] function
//! maps (state, event) to (state, effects), and [`TurnCoordinator`] owns the
//! single live copy of that state together with the conversation log.

mod coordinator;
mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use coordinator::TurnCoordinator;
pub use effect::Effect;
pub use event::Event;
pub use state::{ConversationState, TurnState};
pub use transition::{transition, TransitionError, TransitionResult};
