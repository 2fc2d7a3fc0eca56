//! Speech-to-text (STT) via the speech service's `/stt` endpoint

use std::time::Duration;

use async_trait::async_trait;

use super::{ProviderResponse, classify};
use crate::error::ErrorKind;
use crate::{Error, Result};

/// File name announced for the uploaded clip
const UPLOAD_FILE_NAME: &str = "recorded_audio.wav";

/// Response from the `/stt` endpoint
#[derive(serde::Deserialize)]
struct SttResponse {
    text: Option<String>,
}

/// Turns an audio clip into recognized text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe `audio` (WAV bytes); a single attempt, never retried
    async fn transcribe(&self, audio: &[u8]) -> ProviderResponse<String>;
}

/// Transcribes speech through the remote speech service
pub struct HttpTranscriber {
    client: reqwest::Client,
    url: String,
}

impl HttpTranscriber {
    /// Create a client for the service at `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: format!("{}/stt", base_url.trim_end_matches('/')),
        })
    }

    /// Upload `audio` and return the recognized text
    ///
    /// # Errors
    ///
    /// Returns error on network failure, timeout, non-2xx status, invalid
    /// JSON, or a response without `text`
    pub async fn request(&self, audio: &[u8]) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::ContentMissing("no audio to transcribe".to_string()));
        }

        tracing::debug!(url = %self.url, audio_bytes = audio.len(), "starting transcription");

        let form = reqwest::multipart::Form::new().part(
            "audio_file",
            reqwest::multipart::Part::bytes(audio.to_vec())
                .file_name(UPLOAD_FILE_NAME)
                .mime_str("audio/wav")?,
        );

        let response = self.client.post(&self.url).multipart(form).send().await?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::NetworkFailure(format!("STT service error {status}: {body}")));
        }

        let result: SttResponse = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("STT response is not JSON ({e}): {body}")))?;

        let text = result.text.ok_or_else(|| {
            Error::ContentMissing(format!("STT response has no text field: {body}"))
        })?;

        tracing::info!(transcript = %text, "transcription complete");
        Ok(text)
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> ProviderResponse<String> {
        classify("transcribe", self.request(audio).await)
    }
}

/// Transcriber used when the speech service client could not be built
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableTranscriber;

#[async_trait]
impl Transcriber for UnavailableTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> ProviderResponse<String> {
        Err(ErrorKind::NetworkFailure)
    }
}
