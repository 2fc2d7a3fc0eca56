//! General conversation through an OpenAI-compatible chat completions API

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ConversationConfig;
use crate::error::{ErrorKind, ProviderResponse, classify};
use crate::{Error, Result};

/// Sampling parameters for one reply
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.7,
        }
    }
}

impl From<&ConversationConfig> for GenerationParams {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// Generates a free-form reply to recognized text
#[async_trait]
pub trait ConversationProvider: Send + Sync {
    /// Whether the provider is configured well enough to be worth asking
    fn is_available(&self) -> bool {
        true
    }

    /// Reply to `text`
    async fn reply(&self, text: &str, params: &GenerationParams) -> ProviderResponse<String>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// Talks to a local language model server
pub struct ChatCompletionsProvider {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl ChatCompletionsProvider {
    /// Create a provider for the server at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.into(),
        })
    }

    /// Request a completion for `text`
    ///
    /// # Errors
    ///
    /// Returns error on network failure, timeout, non-2xx status, invalid
    /// JSON, or a response without content
    pub async fn complete(&self, text: &str, params: &GenerationParams) -> Result<String> {
        let preview: String = text.chars().take(50).collect();
        tracing::debug!(url = %self.url, prompt = %preview, "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: text,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self.client.post(&self.url).json(&request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::NetworkFailure(format!(
                "completion server error {status}: {body}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!("completion response is not JSON ({e}): {body}"))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| Error::ContentMissing(format!("completion has no content: {body}")))?;

        tracing::info!(chars = content.chars().count(), "completion received");
        Ok(content)
    }
}

#[async_trait]
impl ConversationProvider for ChatCompletionsProvider {
    async fn reply(&self, text: &str, params: &GenerationParams) -> ProviderResponse<String> {
        classify("converse", self.complete(text, params).await)
    }
}

/// Conversation provider used when no model server is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableConversation;

#[async_trait]
impl ConversationProvider for UnavailableConversation {
    fn is_available(&self) -> bool {
        false
    }

    async fn reply(&self, _text: &str, _params: &GenerationParams) -> ProviderResponse<String> {
        Err(ErrorKind::NetworkFailure)
    }
}
