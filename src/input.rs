//! Terminal input routing
//!
//! Command lines become coordinator events. Everything else is treated as
//! speech and fed to the terminal capture engine (see [`terminal_capture`](crate::capture::terminal_capture)).

use crate::capture::TerminalInput;
use crate::state_machine::Event;
use std::io::BufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCommand {
    /// Empty line or `/talk`
    ToggleCapture,
    Reset,
    ToggleMute,
    Quit,
    /// Unrecognised `/command`
    Unknown(String),
    /// Anything else is what the user said
    Speech(String),
}

pub fn parse_line(line: &str) -> InputCommand {
    let line = line.trim();
    match line {
        "" | "/talk" => InputCommand::ToggleCapture,
        "/reset" => InputCommand::Reset,
        "/mute" => InputCommand::ToggleMute,
        "/quit" | "/exit" => InputCommand::Quit,
        command if command.starts_with('/') => InputCommand::Unknown(command.to_string()),
        speech => InputCommand::Speech(speech.to_string()),
    }
}

/// Read stdin on a dedicated thread.
///
/// A blocking read on a runtime thread would hold up shutdown, so the thread
/// is detached and simply dies with the process.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Route lines until EOF, `/quit` or shutdown.
///
/// Cancels `shutdown` on EOF and `/quit`.
pub async fn route_input(
    mut lines: mpsc::Receiver<String>,
    event_tx: mpsc::Sender<Event>,
    speech: TerminalInput,
    shutdown: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            biased;
            () = shutdown.cancelled() => return,
            line = lines.recv() => line,
        };

        let Some(line) = line else {
            tracing::info!("Input closed");
            break;
        };

        let event = match parse_line(&line) {
            InputCommand::ToggleCapture => {
                speech.talk_requested();
                Event::ToggleCapture
            }
            InputCommand::Reset => Event::Reset,
            InputCommand::ToggleMute => Event::ToggleMute,
            InputCommand::Quit => break,
            InputCommand::Unknown(command) => {
                println!("Unknown command {command}. Try /talk, /reset, /mute or /quit");
                continue;
            }
            InputCommand::Speech(text) => {
                if !speech.awaiting_speech() {
                    println!("Not listening. Press Enter (or /talk) first, then speak.");
                    continue;
                }
                if speech.send(text).await.is_err() {
                    break;
                }
                continue;
            }
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }

    shutdown.cancel();
}
