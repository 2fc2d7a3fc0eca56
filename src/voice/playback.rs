//! Audio playback to speakers via `aplay`

use std::path::Path;

use async_trait::async_trait;

use super::utility::run_utility;
use super::{ProviderResponse, classify};
use crate::config::AudioConfig;
use crate::error::ErrorKind;
use crate::{Error, Result};

/// Plays an audio clip on the output device
#[async_trait]
pub trait PlaybackGateway: Send + Sync {
    /// Play `source` to completion
    async fn play(&self, source: &Path) -> ProviderResponse<()>;
}

/// Plays audio with the ALSA `aplay` utility
#[derive(Debug, Clone)]
pub struct AplayPlayback {
    binary: String,
    device: Option<String>,
}

impl AplayPlayback {
    /// Create a playback gateway from the audio configuration
    #[must_use]
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            binary: config.playback_binary.clone(),
            device: config.playback_device.clone(),
        }
    }

    /// Use a different playback binary
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Arguments passed to the playback utility
    #[must_use]
    pub fn args(&self, source: &Path) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        if let Some(device) = &self.device {
            args.push("-D".to_string());
            args.push(device.clone());
        }
        args.push(source.display().to_string());
        args
    }

    /// Play `source`
    ///
    /// # Errors
    ///
    /// Returns error if the file or utility is missing, or playback fails
    pub async fn play_file(&self, source: &Path) -> Result<()> {
        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(Error::ContentMissing(format!(
                "no audio to play at {}",
                source.display()
            )));
        }

        run_utility(&self.binary, &self.args(source)).await?;
        tracing::debug!(path = %source.display(), "playback complete");
        Ok(())
    }
}

#[async_trait]
impl PlaybackGateway for AplayPlayback {
    async fn play(&self, source: &Path) -> ProviderResponse<()> {
        classify("playback", self.play_file(source).await)
    }
}

/// Playback gateway used when no output device is usable
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailablePlayback;

#[async_trait]
impl PlaybackGateway for UnavailablePlayback {
    async fn play(&self, _source: &Path) -> ProviderResponse<()> {
        Err(ErrorKind::DeviceUnavailable)
    }
}
