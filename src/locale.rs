//! Recognition/synthesis locale handling

use serde::{Deserialize, Serialize};

/// Locale used when a language code has no known mapping
pub const DEFAULT_LOCALE: &str = "en-US";

const KNOWN_LOCALES: &[(&str, &str)] = &[
    ("en", "en-US"),
    ("es", "es-ES"),
    ("fr", "fr-FR"),
    ("de", "de-DE"),
    ("it", "it-IT"),
    ("pt", "pt-BR"),
];

/// Current conversation language, as reported by the agent.
///
/// Holds the tag exactly as received (`"es"`, `"es-MX"`); [`Self::locale`]
/// expands it into a full engine locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePreference(String);

impl LanguagePreference {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn tag(&self) -> &str {
        &self.0
    }

    /// Full locale for the capture and playback engines
    pub fn locale(&self) -> String {
        locale_for(&self.0)
    }

    /// Whether `tag` names a different language than the current one
    pub fn differs_from(&self, tag: &str) -> bool {
        !self.0.eq_ignore_ascii_case(tag)
    }
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self::new("en")
    }
}

/// Map a language tag onto an engine locale.
///
/// Tags that already carry a region are passed through unchanged.
pub fn locale_for(tag: &str) -> String {
    let tag = tag.trim();
    if tag.contains('-') {
        return tag.to_string();
    }
    KNOWN_LOCALES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(tag))
        .map_or_else(
            || {
                tracing::debug!(tag, "No locale mapping for language, using default");
                DEFAULT_LOCALE.to_string()
            },
            |(_, locale)| (*locale).to_string(),
        )
}

/// Bare language part of a locale (`"es-ES"` -> `"es"`)
pub fn language_of(locale: &str) -> &str {
    locale.split(['-', '_']).next().unwrap_or(locale)
}
