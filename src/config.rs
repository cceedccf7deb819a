//! Client configuration from the environment

use crate::channel::{ChannelConfig, DEFAULT_RECONNECT_DELAY};
use crate::locale::LanguagePreference;
use crate::playback::Voice;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_URL: &str = "ws://127.0.0.1:8000/ws";
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PLAYBACK_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("{var} must be true or false, got {value:?}")]
    InvalidBool { var: &'static str, value: String },
    #[error("{var} entries must look like Name=locale, got {entry:?}")]
    InvalidVoice { var: &'static str, entry: String },
    #[error("{var} must be a ws:// or wss:// URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}

/// Configuration for the terminal client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub channel: ChannelConfig,
    pub capture_timeout: Duration,
    pub playback_timeout: Duration,
    /// External synthesizer command line; `None` prints replies instead
    pub tts_command: Option<String>,
    /// Voices the synthesizer offers
    pub voices: Vec<Voice>,
    pub muted: bool,
    pub language: LanguagePreference,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::new(DEFAULT_URL),
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            playback_timeout: DEFAULT_PLAYBACK_TIMEOUT,
            tts_command: None,
            voices: Vec::new(),
            muted: false,
            language: LanguagePreference::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup. Unset and blank variables use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = get("VOICE_CHAT_URL").unwrap_or_else(|| DEFAULT_URL.to_string());
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl {
                var: "VOICE_CHAT_URL",
                value: url,
            });
        }

        let mut channel = ChannelConfig::new(url);
        channel.reconnect_delay = parse_number(&get, "VOICE_CHAT_RECONNECT_DELAY_MS")?
            .map_or(DEFAULT_RECONNECT_DELAY, Duration::from_millis);
        channel.max_reconnect_attempts = parse_number(&get, "VOICE_CHAT_MAX_RECONNECTS")?
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        let capture_timeout = parse_number(&get, "VOICE_CHAT_CAPTURE_TIMEOUT_SECS")?
            .map_or(DEFAULT_CAPTURE_TIMEOUT, Duration::from_secs);
        let playback_timeout = parse_number(&get, "VOICE_CHAT_PLAYBACK_TIMEOUT_SECS")?
            .map_or(DEFAULT_PLAYBACK_TIMEOUT, Duration::from_secs);

        let muted = match get("VOICE_CHAT_MUTED") {
            None => false,
            Some(value) => parse_bool(&value).ok_or(ConfigError::InvalidBool {
                var: "VOICE_CHAT_MUTED",
                value,
            })?,
        };

        let voices = get("VOICE_CHAT_VOICES")
            .map(|list| parse_voices(&list))
            .transpose()?
            .unwrap_or_default();

        let language = get("VOICE_CHAT_LANGUAGE")
            .map(LanguagePreference::new)
            .unwrap_or_default();

        Ok(Self {
            channel,
            capture_timeout,
            playback_timeout,
            tts_command: get("VOICE_CHAT_TTS_COMMAND"),
            voices,
            muted,
            language,
        })
    }
}

fn parse_number(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<u64>, ConfigError> {
    get(var)
        .map(|value| {
            value
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_voices(list: &str) -> Result<Vec<Voice>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((name, locale)) if !name.trim().is_empty() && !locale.trim().is_empty() => {
                Ok(Voice::new(name.trim(), locale.trim()))
            }
            _ => Err(ConfigError::InvalidVoice {
                var: "VOICE_CHAT_VOICES",
                entry: entry.to_string(),
            }),
        })
        .collect()
}
