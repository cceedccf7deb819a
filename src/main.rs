//! Voice chat - terminal client for a remote conversational agent
//!
//! Coordinates turn-taking between speech capture, a resilient WebSocket
//! channel to the agent and speech playback.

mod capture;
mod channel;
mod config;
mod conversation;
mod input;
mod locale;
mod playback;
mod presenter;
mod runtime;
mod state_machine;

use capture::{CaptureEngine, SpeechCaptureSession};
use channel::ResilientChannel;
use config::ClientConfig;
use playback::{CommandPlaybackEngine, PlaybackEngine, PrintPlaybackEngine, SpeechPlaybackQueue};
use presenter::TerminalPresenter;
use runtime::ProductionRuntime;
use state_machine::{TurnCoordinator, TurnState};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging; stdout belongs to the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voice_chat=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!(
        url = %config.channel.url,
        reconnect_delay_ms = u64::try_from(config.channel.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
        max_reconnects = ?config.channel.max_reconnect_attempts,
        tts_command = ?config.tts_command,
        muted = config.muted,
        language = config.language.tag(),
        "Configuration loaded"
    );

    let shutdown = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(64);
    let (speech_input, terminal_engine) = capture::terminal_capture(16);

    let (channel, channel_task) =
        ResilientChannel::spawn(config.channel.clone(), event_tx.clone(), shutdown.clone());

    let capture_engine: Arc<dyn CaptureEngine> = Arc::new(terminal_engine);
    let playback_engine: Arc<dyn PlaybackEngine> = match config
        .tts_command
        .as_deref()
        .and_then(CommandPlaybackEngine::from_command_line)
    {
        Some(engine) => Arc::new(engine.with_voices(config.voices.clone())),
        None => {
            tracing::info!("No VOICE_CHAT_TTS_COMMAND set, printing replies instead of speaking");
            Arc::new(PrintPlaybackEngine)
        }
    };

    let runtime: ProductionRuntime = runtime::VoiceChatRuntime::new(
        TurnCoordinator::new(TurnState::new(config.muted, config.language.clone())),
        channel.clone(),
        TerminalPresenter::stdout(),
        SpeechCaptureSession::new(capture_engine, event_tx.clone(), config.capture_timeout),
        SpeechPlaybackQueue::new(playback_engine, event_tx.clone(), config.playback_timeout),
        event_rx,
        shutdown.clone(),
    );

    println!("Press Enter (or /talk) to speak, /mute, /reset, /quit to leave.");

    tokio::spawn(input::route_input(
        input::spawn_stdin_reader(),
        event_tx,
        speech_input,
        shutdown.clone(),
    ));

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            ctrl_c.cancel();
        }
    });

    let coordinator = runtime.run().await;
    channel.shutdown();
    channel_task.await?;

    tracing::info!(
        messages = coordinator.log().len(),
        "Voice chat client stopped"
    );
    Ok(())
}
