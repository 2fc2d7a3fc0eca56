//! Intent routing
//!
//! Decides whether recognized text is a weather question or general
//! conversation and delegates to the matching provider. The emotion scan
//! runs alongside and only ever touches the indicator.

mod rules;

pub use rules::{
    EMOTION_RULES, Emotion, INTENT_RULES, Intent, LOCATION_TRIGGERS, detect_emotion,
    matching_intents, resolve_locality, words,
};

use std::sync::Arc;
use std::time::Duration;

use crate::indicator::{IndicatorState, StatusIndicator};
use crate::providers::{ConversationProvider, GenerationParams, WeatherProvider};

/// Minimum trimmed length, in characters, of text worth routing
pub const MIN_TEXT_CHARS: usize = 2;

/// Reply when no provider can take the request
pub const NO_PROVIDER_APOLOGY: &str = "죄송합니다. 날씨나 일반 대화 기능을 사용할 수 없습니다.";

/// Whether `text` carries enough content to route
#[must_use]
pub fn is_routable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_TEXT_CHARS
}

/// Outcome of routing one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Nothing usable was said
    Skipped,
    /// A provider (or the apology) answered
    Reply {
        /// Intent that produced the reply, `None` for the apology
        intent: Option<Intent>,
        /// Response text, `None` when the provider came back empty
        text: Option<String>,
    },
}

/// Routes recognized text to the weather or conversation provider
pub struct IntentRouter {
    weather: Arc<dyn WeatherProvider>,
    conversation: Arc<dyn ConversationProvider>,
    indicator: Arc<dyn StatusIndicator>,
    params: GenerationParams,
    default_locality: String,
    emotion_dwell: Duration,
}

impl IntentRouter {
    /// Create a router with default parameters
    #[must_use]
    pub fn new(
        weather: Arc<dyn WeatherProvider>,
        conversation: Arc<dyn ConversationProvider>,
        indicator: Arc<dyn StatusIndicator>,
    ) -> Self {
        Self {
            weather,
            conversation,
            indicator,
            params: GenerationParams::default(),
            default_locality: "Gunpo".to_string(),
            emotion_dwell: Duration::from_secs(1),
        }
    }

    /// Set the conversation sampling parameters
    #[must_use]
    pub const fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Set the locality used when a weather question names none
    #[must_use]
    pub fn with_default_locality(mut self, locality: impl Into<String>) -> Self {
        self.default_locality = locality.into();
        self
    }

    /// Set how long an emotion color is held
    #[must_use]
    pub const fn with_emotion_dwell(mut self, dwell: Duration) -> Self {
        self.emotion_dwell = dwell;
        self
    }

    /// Route `text` to a provider and return its reply
    pub async fn route(&self, text: Option<&str>) -> Routed {
        let Some(text) = text.map(str::trim).filter(|t| is_routable(t)) else {
            tracing::debug!("nothing to route");
            return Routed::Skipped;
        };

        self.acknowledge_emotion(text).await;

        for intent in matching_intents(text) {
            match intent {
                Intent::Weather if self.weather.is_available() => {
                    let locality = rules::resolve_locality(text, &self.default_locality);
                    tracing::info!(intent = ?intent, locality = %locality, "routing");

                    let summary = self.weather.summary(&locality).await;
                    return Routed::Reply {
                        intent: Some(intent),
                        text: non_empty(summary),
                    };
                }
                Intent::Conversation if self.conversation.is_available() => {
                    tracing::info!(intent = ?intent, "routing");

                    let reply = self.conversation.reply(text, &self.params).await.ok();
                    return Routed::Reply {
                        intent: Some(intent),
                        text: reply.and_then(non_empty),
                    };
                }
                _ => tracing::debug!(intent = ?intent, "provider unavailable, trying next"),
            }
        }

        tracing::warn!("no provider available");
        Routed::Reply {
            intent: None,
            text: Some(NO_PROVIDER_APOLOGY.to_string()),
        }
    }

    async fn acknowledge_emotion(&self, text: &str) {
        let Some(emotion) = detect_emotion(text) else {
            return;
        };

        tracing::info!(emotion = ?emotion, color = %emotion.color(), "emotion detected");
        self.indicator.set_color(emotion.color());
        tokio::time::sleep(self.emotion_dwell).await;
        self.indicator.show(IndicatorState::Thinking);
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}
