//! Runtime for executing the turn-taking loop
//!
//! Drains the single event channel, feeds each event to the
//! [`TurnCoordinator`](crate::state_machine::TurnCoordinator) and carries out
//! the effects it returns against the channel, capture, playback and
//! presentation seams.

mod executor;
pub mod traits;


pub use executor::VoiceChatRuntime;
pub use traits::*;

use crate::capture::CaptureEngine;
use crate::channel::ChannelHandle;
use crate::playback::PlaybackEngine;
use crate::presenter::TerminalPresenter;

/// Type alias for the terminal client with concrete implementations
pub type ProductionRuntime =
    VoiceChatRuntime<ChannelHandle, TerminalPresenter, dyn CaptureEngine, dyn PlaybackEngine>;
