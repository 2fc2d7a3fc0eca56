//! Text-to-speech (TTS) via the speech service's `/generate_tts` endpoint

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;

use super::{ProviderResponse, classify};
use crate::error::ErrorKind;
use crate::{Error, Result};

/// Turns response text into a playable clip
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` spoken in `locale`
    async fn synthesize(&self, text: &str, locale: &str) -> ProviderResponse<Vec<u8>>;
}

/// Synthesizes speech through the remote speech service
pub struct HttpSynthesizer {
    client: reqwest::Client,
    url: String,
}

impl HttpSynthesizer {
    /// Create a client for the service at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: format!("{}/generate_tts", base_url.trim_end_matches('/')),
        })
    }

    /// Request synthesis and collect the streamed audio body
    ///
    /// # Errors
    ///
    /// Returns error on network failure, non-2xx status, or any content
    /// type other than `audio/*`
    pub async fn request(&self, text: &str, locale: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            text: &'a str,
            lang: &'a str,
        }

        let preview: String = text.chars().take(30).collect();
        tracing::debug!(url = %self.url, text = %preview, locale, "starting synthesis");

        let response = self
            .client
            .post(&self.url)
            .json(&TtsRequest { text, lang: locale })
            .send()
            .await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::NetworkFailure(format!("TTS service error {status}: {body}")));
        }

        if !content_type.starts_with("audio/") {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ContentMissing(format!(
                "TTS service returned {content_type:?} instead of audio: {body}"
            )));
        }

        let mut audio = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            audio.extend_from_slice(&chunk?);
        }

        if audio.is_empty() {
            return Err(Error::ContentMissing("TTS service returned an empty body".to_string()));
        }

        tracing::info!(bytes = audio.len(), content_type = %content_type, "synthesis complete");
        Ok(audio)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, locale: &str) -> ProviderResponse<Vec<u8>> {
        classify("synthesize", self.request(text, locale).await)
    }
}

/// Synthesizer used when the speech service client could not be built
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSynthesizer;

#[async_trait]
impl Synthesizer for UnavailableSynthesizer {
    async fn synthesize(&self, _text: &str, _locale: &str) -> ProviderResponse<Vec<u8>> {
        Err(ErrorKind::NetworkFailure)
    }
}
