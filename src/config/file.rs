//! TOML configuration file loading
//!
//! Supports `~/.config/hearth/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{Error, Result};

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct HearthConfigFile {
    /// Speech service configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Capture/playback configuration
    #[serde(default)]
    pub audio: AudioFileConfig,

    /// Weather provider configuration
    #[serde(default)]
    pub weather: WeatherFileConfig,

    /// Conversation provider configuration
    #[serde(default)]
    pub conversation: ConversationFileConfig,

    /// LED status strip configuration
    #[serde(default)]
    pub led: LedFileConfig,

    /// Session loop timings
    #[serde(default)]
    pub timings: TimingsFileConfig,
}

/// Speech (STT/TTS) service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Base URL of the speech service (e.g. `http://192.168.137.116:5001`)
    pub url: Option<String>,

    /// Voice locale sent with synthesis requests
    pub tts_lang: Option<String>,

    /// Timeout for STT/TTS calls in seconds
    pub timeout_secs: Option<u64>,
}

/// Audio device configuration
#[derive(Debug, Default, Deserialize)]
pub struct AudioFileConfig {
    /// ALSA capture device (e.g. "plughw:3,0")
    pub record_device: Option<String>,

    /// Capture sample rate in Hz
    pub sample_rate: Option<u32>,

    /// Capture channel count
    pub channels: Option<u16>,

    /// Capture duration per turn in seconds
    pub record_duration_secs: Option<u64>,

    /// ALSA playback device
    pub playback_device: Option<String>,

    /// Directory holding the per-turn audio files
    pub work_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeatherFileConfig {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub geo_url: Option<String>,
    pub default_locality: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConversationFileConfig {
    pub url: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LedFileConfig {
    pub enabled: Option<bool>,
    pub count: Option<usize>,
    pub brightness: Option<f32>,
    pub power_pin: Option<u32>,
    pub device: Option<String>,
    pub gpio_root: Option<String>,
}

/// Session loop timings, all in milliseconds
#[derive(Debug, Default, Deserialize)]
pub struct TimingsFileConfig {
    pub inter_turn_ms: Option<u64>,
    pub failure_backoff_ms: Option<u64>,
    pub emotion_dwell_ms: Option<u64>,
    pub warm_up_ms: Option<u64>,
}

/// Load the TOML config file from `path`, or the standard path when `None`
///
/// Returns `HearthConfigFile::default()` if the file doesn't exist or can't be used.
#[must_use]
pub fn load_config_file(path: Option<&Path>) -> HearthConfigFile {
    let Some(path) = path.map(Path::to_path_buf).or_else(config_file_path) else {
        return HearthConfigFile::default();
    };

    if !path.exists() {
        return HearthConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                kind = %e.kind(),
                error = %e,
                "unusable config file, using defaults"
            );
            HearthConfigFile::default()
        }
    }
}

/// Read, parse and check the config file at `path`
///
/// # Errors
///
/// Returns error if the file can't be read, isn't valid TOML, or sets a
/// count or rate to zero
pub fn read_config_file(path: &Path) -> Result<HearthConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config: HearthConfigFile = toml::from_str(&content)?;

    let zeroed = [
        ("audio.sample_rate", config.audio.sample_rate == Some(0)),
        ("audio.channels", config.audio.channels == Some(0)),
        ("led.count", config.led.count == Some(0)),
    ]
    .into_iter()
    .find_map(|(key, zero)| zero.then_some(key));

    if let Some(key) = zeroed {
        return Err(Error::Config(format!("{key} must be greater than zero")));
    }

    Ok(config)
}

/// Return the config file path: `~/.config/hearth/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("hearth").join("config.toml"))
}
