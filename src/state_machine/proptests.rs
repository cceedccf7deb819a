//! Property-based tests for the state machine
//!
//! Random action sequences are played against a [`TurnCoordinator`] wired to
//! a simulated world that tracks which subsystem is running, and the
//! turn-taking invariants are checked after every step.

use super::*;
use crate::capture::CaptureErrorKind;
use crate::channel::envelope::{InboundEnvelope, OutboundEnvelope};
use crate::channel::ChannelError;
use crate::conversation::ERROR_PREFIX;
use crate::locale::LanguagePreference;
use proptest::prelude::*;
use std::collections::VecDeque;

// ============================================================================
// Simulated World
// ============================================================================

/// Something that can happen to the client from the outside
#[derive(Debug, Clone)]
enum Action {
    Open,
    Close,
    /// Socket died but the closure has not been reported yet
    LinkDown,
    AgentReply { text: String, language: Option<String> },
    AgentError(String),
    Garbage,
    Transcript(String),
    CaptureFails(CaptureErrorKind),
    StaleTranscript,
    PlaybackEnds,
    PlaybackFails,
    StalePlaybackEnd,
    Toggle,
    Reset,
    Mute,
}

struct World {
    coordinator: TurnCoordinator,
    /// Activation of the running capture attempt
    capture: Option<u64>,
    /// Utterance currently audible
    playback: Option<u64>,
    connected: bool,
    link_up: bool,
    sent: Vec<OutboundEnvelope>,
}

impl World {
    fn new(muted: bool) -> Self {
        Self {
            coordinator: TurnCoordinator::new(TurnState::new(muted, LanguagePreference::default())),
            capture: None,
            playback: None,
            connected: false,
            link_up: false,
            sent: Vec::new(),
        }
    }

    fn state(&self) -> ConversationState {
        self.coordinator.state()
    }

    fn log_texts(&self) -> Vec<String> {
        self.coordinator
            .log()
            .entries()
            .map(|m| m.text().to_string())
            .collect()
    }

    /// Translate an action into the event the subsystems would emit, if any
    fn event_for(&mut self, action: Action) -> Option<Event> {
        let turn = self.coordinator.turn_state();
        let stale_activation = turn.activation + 7;
        let stale_utterance = turn.utterance + 7;

        match action {
            Action::Open if !self.connected => {
                self.connected = true;
                self.link_up = true;
                Some(Event::ChannelOpen)
            }
            Action::Close if self.connected => {
                self.connected = false;
                self.link_up = false;
                Some(Event::ChannelClosed)
            }
            Action::LinkDown => {
                self.link_up = false;
                None
            }
            Action::AgentReply { text, language } if self.link_up => {
                Some(Event::Inbound(InboundEnvelope::AgentResponse { text, language }))
            }
            Action::AgentError(text) if self.link_up => {
                Some(Event::Inbound(InboundEnvelope::Error { text }))
            }
            Action::Garbage if self.link_up => Some(Event::ProtocolError {
                detail: "payload is not valid JSON".to_string(),
            }),
            Action::Transcript(text) => self
                .capture
                .take()
                .map(|activation| Event::Transcript { activation, text }),
            Action::CaptureFails(kind) => self
                .capture
                .take()
                .map(|activation| Event::CaptureError { activation, kind }),
            Action::StaleTranscript => Some(Event::Transcript {
                activation: stale_activation,
                text: "late words".to_string(),
            }),
            Action::PlaybackEnds => self
                .playback
                .take()
                .map(|utterance| Event::PlaybackEnded { utterance }),
            Action::PlaybackFails => self.playback.take().map(|utterance| Event::PlaybackError {
                utterance,
                detail: "device lost".to_string(),
            }),
            Action::StalePlaybackEnd => Some(Event::PlaybackEnded {
                utterance: stale_utterance,
            }),
            Action::Toggle => Some(Event::ToggleCapture),
            Action::Reset => Some(Event::Reset),
            Action::Mute => Some(Event::ToggleMute),
            _ => None,
        }
    }

    /// Apply an action; returns whether the log was cleared
    fn apply(&mut self, action: Action) -> bool {
        let Some(event) = self.event_for(action) else {
            return false;
        };

        let mut cleared = false;
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            for effect in self.coordinator.handle(event) {
                match effect {
                    Effect::StartCapture { activation, .. } => self.capture = Some(activation),
                    Effect::StopCapture => self.capture = None,
                    Effect::Speak { utterance, .. } => self.playback = Some(utterance),
                    Effect::CancelPlayback => self.playback = None,
                    Effect::ClearLog => cleared = true,
                    Effect::Send(envelope) => {
                        if self.link_up {
                            self.sent.push(envelope);
                        } else {
                            pending.push_back(Event::SendFailed {
                                error: ChannelError::NotConnected,
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
        cleared
    }

    fn check_invariants(&self) -> Result<(), TestCaseError> {
        let state = self.state();
        prop_assert_eq!(
            state == ConversationState::Listening,
            self.capture.is_some(),
            "Listening iff capture active (state {:?}, capture {:?})",
            state,
            self.capture
        );
        prop_assert_eq!(
            state == ConversationState::Speaking,
            self.playback.is_some(),
            "Speaking iff playback active (state {:?}, playback {:?})",
            state,
            self.playback
        );
        prop_assert!(self.capture.is_none() || self.playback.is_none());
        if !self.connected {
            prop_assert_eq!(state, ConversationState::Disconnected);
        }
        Ok(())
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_language() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("en".to_string())),
        Just(Some("es".to_string())),
        Just(Some("fr".to_string())),
        Just(Some("pt-PT".to_string())),
    ]
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![
        3 => Just(Action::Open),
        1 => Just(Action::Close),
        1 => Just(Action::LinkDown),
        3 => ("[a-zA-Z ]{1,20}", arb_language())
            .prop_map(|(text, language)| Action::AgentReply { text, language }),
        1 => "[a-z ]{1,20}".prop_map(Action::AgentError),
        1 => Just(Action::Garbage),
        3 => "[a-zA-Z ]{1,20}".prop_map(Action::Transcript),
        1 => prop_oneof![
            Just(CaptureErrorKind::PermissionDenied),
            Just(CaptureErrorKind::Generic)
        ]
        .prop_map(Action::CaptureFails),
        1 => Just(Action::StaleTranscript),
        2 => Just(Action::PlaybackEnds),
        1 => Just(Action::PlaybackFails),
        1 => Just(Action::StalePlaybackEnd),
        4 => Just(Action::Toggle),
        1 => Just(Action::Reset),
        1 => Just(Action::Mute),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Subsystem and connectivity invariants hold after every step
    #[test]
    fn prop_invariants_hold(
        muted in any::<bool>(),
        actions in proptest::collection::vec(arb_action(), 0..60),
    ) {
        let mut world = World::new(muted);
        world.check_invariants()?;

        for action in actions {
            world.apply(action);
            world.check_invariants()?;
        }
    }

    /// The log only ever grows, except for an explicit reset
    #[test]
    fn prop_log_is_append_only(actions in proptest::collection::vec(arb_action(), 0..60)) {
        let mut world = World::new(false);

        for action in actions {
            let before = world.log_texts();
            let cleared = world.apply(action);
            let after = world.log_texts();

            if !cleared {
                prop_assert!(after.len() >= before.len());
                prop_assert_eq!(&after[..before.len()], &before[..]);
            }
        }
    }

    /// Mute flag flips exactly once per toggle, whatever else happens
    #[test]
    fn prop_mute_flag_follows_toggles(
        muted in any::<bool>(),
        actions in proptest::collection::vec(arb_action(), 0..60),
    ) {
        let mut world = World::new(muted);
        let toggles = actions.iter().filter(|a| matches!(a, Action::Mute)).count();

        for action in actions {
            world.apply(action);
        }

        prop_assert_eq!(world.coordinator.is_muted(), muted ^ (toggles % 2 == 1));
    }

    /// A transcript from an abandoned attempt changes nothing
    #[test]
    fn prop_stale_transcript_is_noop(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut world = World::new(false);
        for action in actions {
            world.apply(action);
        }

        let before = world.coordinator.turn_state().clone();
        let stale = before.activation + 1;
        let effects = world.coordinator.handle(Event::Transcript {
            activation: stale,
            text: "late".to_string(),
        });

        prop_assert!(effects.is_empty());
        prop_assert_eq!(world.coordinator.turn_state(), &before);
    }

    /// Muting while a reply is audible silences it and returns to Ready
    #[test]
    fn prop_mute_while_speaking_returns_to_ready(text in "[a-zA-Z ]{1,30}", language in arb_language()) {
        let mut world = World::new(false);
        world.apply(Action::Open);
        world.apply(Action::AgentReply { text, language });
        prop_assert_eq!(world.state(), ConversationState::Speaking);

        let effects = world.coordinator.handle(Event::ToggleMute);

        prop_assert_eq!(world.state(), ConversationState::Ready);
        prop_assert!(effects.contains(&Effect::CancelPlayback));
        prop_assert!(effects.contains(&Effect::SetMuted(true)));
    }

    /// Reset empties the log and asks the agent to reset exactly once when connected
    #[test]
    fn prop_reset_from_any_state(actions in proptest::collection::vec(arb_action(), 0..40)) {
        let mut world = World::new(false);
        for action in actions {
            world.apply(action);
        }
        let was_connected = world.state().is_connected();
        let link_up = world.link_up;
        let sent_before = world.sent.len();

        let cleared = world.apply(Action::Reset);

        prop_assert!(cleared);
        world.check_invariants()?;
        let resets = world.sent[sent_before..]
            .iter()
            .filter(|e| **e == OutboundEnvelope::ResetConversation)
            .count();

        if was_connected && link_up {
            prop_assert_eq!(resets, 1);
            prop_assert!(world.coordinator.log().is_empty());
            prop_assert_eq!(world.state(), ConversationState::Ready);
        } else if was_connected {
            // The reset could not be delivered: only the send failure remains
            prop_assert_eq!(resets, 0);
            prop_assert_eq!(world.state(), ConversationState::Disconnected);
            let texts = world.log_texts();
            prop_assert_eq!(texts.len(), 1);
            prop_assert!(texts[0].starts_with(ERROR_PREFIX));
        } else {
            prop_assert_eq!(resets, 0);
            prop_assert!(world.coordinator.log().is_empty());
            prop_assert_eq!(world.state(), ConversationState::Disconnected);
        }
    }

    /// Every delivered user message carries the transcript that produced it
    #[test]
    fn prop_transcripts_become_user_messages(text in "[a-zA-Z][a-zA-Z ]{0,30}") {
        let mut world = World::new(false);
        world.apply(Action::Open);
        world.apply(Action::Toggle);
        prop_assert_eq!(world.state(), ConversationState::Listening);

        world.apply(Action::Transcript(text.clone()));

        prop_assert_eq!(world.state(), ConversationState::Processing);
        prop_assert_eq!(world.sent.as_slice(), &[OutboundEnvelope::user_message(text.clone())]);
        prop_assert_eq!(world.log_texts(), vec![text]);
    }
}
