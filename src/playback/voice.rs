//! Best-effort voice selection

use crate::locale::language_of;

/// Voice names preferred when available, matched by substring
const PREFERRED_VOICE_NAMES: &[&str] = &[
    "Female",
    "Samantha",
    "Victoria",
    "Susan",
    "Karen",
    "Google US English Female",
    "Microsoft Zira",
    "Microsoft Hazel",
    "Monica",
    "Paulina",
    "Helena",
    "Sabina",
];

/// A voice offered by a playback engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    pub locale: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }

    fn speaks(&self, language: &str) -> bool {
        language_of(&self.locale).eq_ignore_ascii_case(language)
    }

    fn is_preferred(&self) -> bool {
        PREFERRED_VOICE_NAMES
            .iter()
            .any(|name| self.name.contains(name))
    }
}

/// Pick a voice for `locale`.
///
/// Prefers a curated voice for the target language, then any voice for that
/// language, then `None` (engine default). Never fails.
pub fn select_voice(voices: &[Voice], locale: &str) -> Option<Voice> {
    let language = language_of(locale);
    let mut for_language = voices.iter().filter(|v| v.speaks(language));

    for_language
        .clone()
        .find(|v| v.is_preferred())
        .or_else(|| for_language.next())
        .cloned()
}
