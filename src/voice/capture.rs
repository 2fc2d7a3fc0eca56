//! Audio capture from the microphone via `arecord`

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::utility::{remove_if_present, run_utility};
use super::{ProviderResponse, classify};
use crate::config::AudioConfig;
use crate::error::ErrorKind;
use crate::{Error, Result};

/// Records a fixed-duration clip to a file
#[async_trait]
pub trait CaptureGateway: Send + Sync {
    /// Record `duration` of audio into `target`
    ///
    /// `target` is removed before recording so a failed capture never
    /// leaves stale audio behind.
    async fn capture(&self, duration: Duration, target: &Path) -> ProviderResponse<()>;
}

/// Captures audio with the ALSA `arecord` utility
#[derive(Debug, Clone)]
pub struct ArecordCapture {
    binary: String,
    device: String,
    format: String,
    sample_rate: u32,
    channels: u16,
}

impl ArecordCapture {
    /// Create a capture gateway from the audio configuration
    #[must_use]
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            binary: config.capture_binary.clone(),
            device: config.record_device.clone(),
            format: config.sample_format.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }

    /// Use a different capture binary
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Arguments passed to the capture utility
    #[must_use]
    pub fn args(&self, duration: Duration, target: &Path) -> Vec<String> {
        // arecord only takes whole seconds
        let seconds = duration.as_secs().max(1);
        vec![
            "-D".to_string(),
            self.device.clone(),
            "-f".to_string(),
            self.format.clone(),
            "-r".to_string(),
            self.sample_rate.to_string(),
            "-c".to_string(),
            self.channels.to_string(),
            "-d".to_string(),
            seconds.to_string(),
            target.display().to_string(),
        ]
    }

    /// Record into `target`
    ///
    /// # Errors
    ///
    /// Returns error if the utility is missing, fails, or writes nothing
    pub async fn record(&self, duration: Duration, target: &Path) -> Result<()> {
        remove_if_present(target).await?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tracing::info!(
            device = %self.device,
            sample_rate = self.sample_rate,
            seconds = duration.as_secs(),
            "recording"
        );

        run_utility(&self.binary, &self.args(duration, target)).await?;

        let metadata = tokio::fs::metadata(target).await.map_err(|_| {
            Error::DeviceFailure(format!("{} produced no file", self.binary))
        })?;
        tracing::debug!(path = %target.display(), bytes = metadata.len(), "recording complete");

        Ok(())
    }
}

#[async_trait]
impl CaptureGateway for ArecordCapture {
    async fn capture(&self, duration: Duration, target: &Path) -> ProviderResponse<()> {
        classify("capture", self.record(duration, target).await)
    }
}

/// Capture gateway used when no input device is usable
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCapture;

#[async_trait]
impl CaptureGateway for UnavailableCapture {
    async fn capture(&self, _duration: Duration, _target: &Path) -> ProviderResponse<()> {
        Err(ErrorKind::DeviceUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, file::HearthConfigFile};

    fn gateway() -> ArecordCapture {
        let config = Config::from_sources(HearthConfigFile::default(), |_| None);
        ArecordCapture::new(&config.audio)
    }

    #[test]
    fn test_args_match_capture_settings() {
        let args = gateway().args(Duration::from_secs(5), Path::new("/tmp/rec.wav"));
        assert_eq!(
            args,
            vec![
                "-D", "plughw:3,0", "-f", "S16_LE", "-r", "44100", "-c", "1", "-d", "5",
                "/tmp/rec.wav"
            ]
        );
    }

    #[test]
    fn test_args_round_up_to_one_second() {
        let args = gateway().args(Duration::from_millis(200), Path::new("a.wav"));
        assert_eq!(args[9], "1");
    }

    #[tokio::test]
    async fn test_missing_binary_removes_stale_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("rec.wav");
        std::fs::write(&target, b"stale").unwrap();

        let result = gateway()
            .with_binary("hearth-no-such-arecord")
            .capture(Duration::from_secs(1), &target)
            .await;

        assert_eq!(result, Err(ErrorKind::DeviceUnavailable));
        assert!(!target.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_without_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("rec.wav");

        let result = gateway()
            .with_binary("true")
            .capture(Duration::from_secs(1), &target)
            .await;

        assert_eq!(result, Err(ErrorKind::DeviceFailure));
    }

    #[tokio::test]
    async fn test_unavailable_capture() {
        let result = UnavailableCapture
            .capture(Duration::from_secs(1), Path::new("x.wav"))
            .await;
        assert_eq!(result, Err(ErrorKind::DeviceUnavailable));
    }
}
