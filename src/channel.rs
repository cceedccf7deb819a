//! Resilient WebSocket channel to the remote agent
//!
//! A supervisor task owns the socket, reconnecting after a fixed delay, and
//! reports connectivity and inbound envelopes as [`Event`]s. The rest of the
//! client only ever holds a cloneable [`ChannelHandle`].

pub mod envelope;

pub use envelope::{EnvelopeError, InboundEnvelope, OutboundEnvelope};

use crate::state_machine::Event;
use futures::{SinkExt, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Not connected to server")]
    NotConnected,
    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub url: String,
    pub reconnect_delay: Duration,
    /// Consecutive failed connects before giving up. `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,
}

impl ChannelConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: None,
        }
    }
}

type Outbox = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

/// Cheap handle for sending on the live connection
#[derive(Clone)]
pub struct ChannelHandle {
    outbox: Outbox,
    shutdown: CancellationToken,
}

impl ChannelHandle {
    /// Queue an envelope on the live connection.
    ///
    /// Fails fast with [`ChannelError::NotConnected`] rather than buffering
    /// across reconnects.
    pub fn send(&self, envelope: &OutboundEnvelope) -> Result<(), ChannelError> {
        let guard = self
            .outbox
            .lock()
            .map_err(|_| ChannelError::Transport("outbox lock poisoned".to_string()))?;
        let tx = guard.as_ref().ok_or(ChannelError::NotConnected)?;
        tx.send(envelope.encode())
            .map_err(|_| ChannelError::NotConnected)?;
        tracing::debug!(kind = envelope.kind(), "Queued outbound envelope");
        Ok(())
    }

    #[allow(dead_code)] // Used by tests
    pub fn is_connected(&self) -> bool {
        self.outbox
            .lock()
            .map(|guard| guard.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(false)
    }

    /// Stop reconnecting and close the socket. No `ChannelClosed` follows.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// Owner of the connection lifecycle
pub struct ResilientChannel {
    config: ChannelConfig,
    event_tx: mpsc::Sender<Event>,
    outbox: Outbox,
    shutdown: CancellationToken,
}

enum SessionEnd {
    /// Remote closed or the transport failed
    Dropped,
    /// Shutdown requested or the event consumer went away
    Stopped,
}

impl ResilientChannel {
    /// Start the supervisor. The returned task finishes on shutdown or when
    /// the reconnect limit is exhausted.
    pub fn spawn(
        config: ChannelConfig,
        event_tx: mpsc::Sender<Event>,
        shutdown: CancellationToken,
    ) -> (ChannelHandle, JoinHandle<()>) {
        let outbox: Outbox = Arc::new(Mutex::new(None));
        let handle = ChannelHandle {
            outbox: outbox.clone(),
            shutdown: shutdown.clone(),
        };
        let channel = Self {
            config,
            event_tx,
            outbox,
            shutdown,
        };
        let task = tokio::spawn(channel.supervise());
        (handle, task)
    }

    async fn supervise(self) {
        let mut failed_attempts: u32 = 0;

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            tracing::info!(url = %self.config.url, "Connecting to agent");
            let connected = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                result = connect_async(self.config.url.as_str()) => result,
            };

            match connected {
                Ok((stream, _response)) => {
                    failed_attempts = 0;
                    match self.run_session(stream).await {
                        SessionEnd::Stopped => break,
                        SessionEnd::Dropped => {}
                    }
                }
                Err(e) => {
                    failed_attempts += 1;
                    tracing::warn!(
                        url = %self.config.url,
                        attempt = failed_attempts,
                        error = %e,
                        "Connection attempt failed"
                    );
                    if self
                        .config
                        .max_reconnect_attempts
                        .is_some_and(|max| failed_attempts >= max)
                    {
                        tracing::error!(
                            attempts = failed_attempts,
                            "Giving up on agent connection"
                        );
                        break;
                    }
                }
            }

            tracing::info!(
                delay_ms = u64::try_from(self.config.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting after delay"
            );
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                () = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.clear_outbox();
        tracing::info!("Channel supervisor stopped");
    }

    async fn run_session<S>(&self, stream: tokio_tungstenite::WebSocketStream<S>) -> SessionEnd
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        self.install_outbox(out_tx);

        tracing::info!(url = %self.config.url, "Connected to agent");
        if self.event_tx.send(Event::ChannelOpen).await.is_err() {
            self.clear_outbox();
            return SessionEnd::Stopped;
        }

        let end = loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break SessionEnd::Stopped;
                }

                Some(text) = out_rx.recv() => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        tracing::warn!(error = %e, "Send failed, dropping connection");
                        break SessionEnd::Dropped;
                    }
                }

                frame = source.next() => {
                    let event = match frame {
                        Some(Ok(Message::Text(text))) => Self::decode_frame(text.as_str()),
                        Some(Ok(Message::Binary(_))) => Some(Event::ProtocolError {
                            detail: "unexpected binary frame".to_string(),
                        }),
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Agent closed the connection");
                            break SessionEnd::Dropped;
                        }
                        // Ping/pong are answered by tungstenite
                        Some(Ok(_)) => None,
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "Transport error");
                            break SessionEnd::Dropped;
                        }
                        None => break SessionEnd::Dropped,
                    };

                    if let Some(event) = event {
                        if self.event_tx.send(event).await.is_err() {
                            break SessionEnd::Stopped;
                        }
                    }
                }
            }
        };

        self.clear_outbox();
        if matches!(end, SessionEnd::Dropped) && !self.shutdown.is_cancelled() {
            tracing::warn!("Disconnected from agent");
            if self.event_tx.send(Event::ChannelClosed).await.is_err() {
                return SessionEnd::Stopped;
            }
        }
        end
    }

    fn decode_frame(text: &str) -> Option<Event> {
        match InboundEnvelope::decode(text) {
            Ok(InboundEnvelope::Unknown { kind }) => {
                tracing::info!(kind = %kind, "Ignoring unknown envelope kind");
                None
            }
            Ok(envelope) => Some(Event::Inbound(envelope)),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed inbound payload");
                Some(Event::ProtocolError {
                    detail: e.to_string(),
                })
            }
        }
    }

    fn install_outbox(&self, tx: mpsc::UnboundedSender<String>) {
        if let Ok(mut guard) = self.outbox.lock() {
            *guard = Some(tx);
        }
    }

    fn clear_outbox(&self) {
        if let Ok(mut guard) = self.outbox.lock() {
            *guard = None;
        }
    }
}
