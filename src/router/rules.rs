//! Keyword tables and the pure text scans over them

use crate::indicator::Color;
use crate::providers::{KNOWN_LOCALITIES, Locality};

/// What the user asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Weather,
    Conversation,
}

/// Keyword-triggered intents, checked in order; conversation is the fallback
pub const INTENT_RULES: &[(Intent, &[&str])] = &[(Intent::Weather, &["날씨", "기온", "온도"])];

/// Words that ask for the weather where the appliance is
pub const LOCATION_TRIGGERS: &[&str] = &["여기", "현재", "지금"];

/// Mood detected in recognized text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Emotion {
    LowMood,
    Irritation,
    Calm,
    Joy,
}

impl Emotion {
    /// Color held on the strip while the emotion is acknowledged
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::LowMood => Color::Blue,
            Self::Irritation => Color::Red,
            Self::Calm => Color::Green,
            Self::Joy => Color::Yellow,
        }
    }
}

/// Emotion keyword groups, mutually exclusive, first match wins
pub const EMOTION_RULES: &[(Emotion, &[&str])] = &[
    (Emotion::LowMood, &["우울"]),
    (Emotion::Irritation, &["예민", "짜증"]),
    (Emotion::Calm, &["안정", "차분", "평온"]),
    (Emotion::Joy, &["기뻐", "행복", "신나"]),
];

/// Whitespace-separated words with surrounding punctuation removed
pub fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

/// First emotion whose keywords appear anywhere in `text`
#[must_use]
pub fn detect_emotion(text: &str) -> Option<Emotion> {
    EMOTION_RULES
        .iter()
        .find(|(_, keywords)| contains_any(text, keywords))
        .map(|(emotion, _)| *emotion)
}

/// Candidate intents for `text` in priority order, always ending with
/// conversation
#[must_use]
pub fn matching_intents(text: &str) -> Vec<Intent> {
    INTENT_RULES
        .iter()
        .filter(|(_, keywords)| contains_any(text, keywords))
        .map(|(intent, _)| *intent)
        .chain(std::iter::once(Intent::Conversation))
        .collect()
}

/// Locality a weather question is about
///
/// A location trigger wins over any named locality; otherwise the first
/// known locality (in table order) present as a whole word; otherwise
/// `default`.
#[must_use]
pub fn resolve_locality(text: &str, default: &str) -> Locality {
    if words(text).any(|w| LOCATION_TRIGGERS.contains(&w)) {
        return Locality::Auto;
    }

    KNOWN_LOCALITIES
        .iter()
        .find(|(spoken, _)| words(text).any(|w| w == *spoken))
        .map_or_else(
            || Locality::Named(default.to_string()),
            |(_, canonical)| Locality::Named((*canonical).to_string()),
        )
}
