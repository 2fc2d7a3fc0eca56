//! Configuration management for the Hearth appliance
//!
//! Read once at startup with priority env > TOML file > default. Nothing
//! here is re-read while the session loop runs.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use file::HearthConfigFile;

/// File name of the per-turn capture artifact
pub const CAPTURE_FILE_NAME: &str = "recorded_audio.wav";

/// File name of the per-turn synthesized response
pub const RESPONSE_FILE_NAME: &str = "response.wav";

/// Placeholder shipped in sample `.env` files; treated as "no key"
const WEATHER_KEY_PLACEHOLDER: &str = "your_api_key_here";

/// Hearth appliance configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the speech service hosting `/stt` and `/generate_tts`
    pub server_url: String,

    /// Voice locale sent with synthesis requests
    pub tts_lang: String,

    /// Timeout for STT/TTS calls
    pub network_timeout: Duration,

    /// Capture/playback configuration
    pub audio: AudioConfig,

    /// Weather provider configuration
    pub weather: WeatherConfig,

    /// Conversation provider configuration
    pub conversation: ConversationConfig,

    /// LED status strip configuration
    pub led: LedConfig,

    /// Session loop timings
    pub timings: TimingConfig,
}

/// Capture and playback utility configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Capture utility binary
    pub capture_binary: String,

    /// ALSA capture device name
    pub record_device: String,

    /// Sample format passed to the capture utility
    pub sample_format: String,

    /// Capture sample rate in Hz
    pub sample_rate: u32,

    /// Capture channel count
    pub channels: u16,

    /// Fixed capture duration per turn
    pub record_duration: Duration,

    /// Playback utility binary
    pub playback_binary: String,

    /// ALSA playback device (platform default when `None`)
    pub playback_device: Option<String>,

    /// Directory holding the capture and response files
    pub work_dir: PathBuf,
}

impl AudioConfig {
    /// Path of the temporary capture artifact
    #[must_use]
    pub fn capture_path(&self) -> PathBuf {
        self.work_dir.join(CAPTURE_FILE_NAME)
    }

    /// Path the synthesized response is written to before playback
    #[must_use]
    pub fn response_path(&self) -> PathBuf {
        self.work_dir.join(RESPONSE_FILE_NAME)
    }
}

/// Weather provider configuration
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key; weather is unavailable without one
    pub api_key: Option<String>,

    /// Current-weather endpoint
    pub url: String,

    /// IP geolocation endpoint used for the `auto` locality
    pub geo_url: String,

    /// Canonical token of the locality used when none is named
    pub default_locality: String,
}

/// Conversation (LLM) provider configuration
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// OpenAI-compatible base URL (e.g. `http://host:5412/v1`)
    pub url: Option<String>,

    /// Model identifier sent with each request
    pub model: String,

    /// Maximum output tokens
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Request timeout
    pub timeout: Duration,
}

/// LED strip and power-line configuration
#[derive(Debug, Clone)]
pub struct LedConfig {
    /// Drive the LED strip at all
    pub enabled: bool,

    /// Number of pixels on the strip
    pub count: usize,

    /// Brightness scale (0.0 to 1.0)
    pub brightness: f32,

    /// BCM pin number of the power-enable line
    pub power_pin: u32,

    /// Device node the pixel frames are written to
    pub device: PathBuf,

    /// Root of the sysfs GPIO tree
    pub gpio_root: PathBuf,
}

/// Fixed delays of the session loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Pause between turns
    pub inter_turn: Duration,

    /// Pause after a turn failed at the loop boundary
    pub failure_backoff: Duration,

    /// How long an emotion color is held
    pub emotion_dwell: Duration,

    /// Pause before the very first capture
    pub warm_up: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            inter_turn: Duration::from_secs(3),
            failure_backoff: Duration::from_secs(5),
            emotion_dwell: Duration::from_secs(1),
            warm_up: Duration::from_secs(2),
        }
    }
}

impl TimingConfig {
    /// All delays zero, for tests and dry runs
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            inter_turn: Duration::ZERO,
            failure_backoff: Duration::ZERO,
            emotion_dwell: Duration::ZERO,
            warm_up: Duration::ZERO,
        }
    }
}

impl Config {
    /// Load configuration from the process environment and the TOML file
    ///
    /// `path` overrides the standard config file location.
    #[must_use]
    pub fn load(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("HEARTH_CONFIG").ok().map(PathBuf::from));
        let fc = file::load_config_file(path.as_deref());
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed file and an environment lookup
    #[must_use]
    pub fn from_sources(fc: HearthConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| env(key).and_then(|v| v.trim().parse::<u64>().ok());

        let server_url = env("PC_SERVER_URL")
            .or(fc.server.url)
            .unwrap_or_else(|| "http://192.168.137.116:5001".to_string());

        let audio = AudioConfig {
            capture_binary: "arecord".to_string(),
            record_device: env("AUDIO_RECORD_DEVICE")
                .or(fc.audio.record_device)
                .unwrap_or_else(|| "plughw:3,0".to_string()),
            sample_format: "S16_LE".to_string(),
            sample_rate: env("AUDIO_RECORD_RATE")
                .and_then(|v| v.trim().parse().ok())
                .or(fc.audio.sample_rate)
                .unwrap_or(44100),
            channels: fc.audio.channels.unwrap_or(1),
            record_duration: Duration::from_secs(
                parsed("RECORD_DURATION")
                    .or(fc.audio.record_duration_secs)
                    .unwrap_or(5),
            ),
            playback_binary: "aplay".to_string(),
            playback_device: env("AUDIO_PLAYBACK_DEVICE").or(fc.audio.playback_device),
            work_dir: env("HEARTH_WORK_DIR")
                .or(fc.audio.work_dir)
                .map_or_else(|| std::env::temp_dir().join("hearth"), PathBuf::from),
        };

        let weather = WeatherConfig {
            api_key: env("OPENWEATHER_API_KEY")
                .or(fc.weather.api_key)
                .filter(|k| !k.trim().is_empty() && k != WEATHER_KEY_PLACEHOLDER),
            url: env("OPENWEATHER_URL")
                .or(fc.weather.url)
                .unwrap_or_else(|| "http://api.openweathermap.org/data/2.5/weather".to_string()),
            geo_url: env("IPINFO_URL")
                .or(fc.weather.geo_url)
                .unwrap_or_else(|| "https://ipinfo.io/json".to_string()),
            default_locality: fc
                .weather
                .default_locality
                .unwrap_or_else(|| "Gunpo".to_string()),
        };

        let conversation = ConversationConfig {
            url: env("LM_STUDIO_URL")
                .or(fc.conversation.url)
                .or_else(|| Some("http://172.30.1.80:5412/v1".to_string()))
                .filter(|u| !u.trim().is_empty() && !u.contains("your_lm_studio_url")),
            model: fc
                .conversation
                .model
                .unwrap_or_else(|| "loaded-model".to_string()),
            max_tokens: fc.conversation.max_tokens.unwrap_or(150),
            temperature: fc.conversation.temperature.unwrap_or(0.7),
            timeout: Duration::from_secs(fc.conversation.timeout_secs.unwrap_or(120)),
        };

        let led = LedConfig {
            enabled: env("LED_ENABLED")
                .and_then(|v| parse_bool(&v))
                .or(fc.led.enabled)
                .unwrap_or(true),
            count: env("LED_COUNT")
                .and_then(|v| v.trim().parse().ok())
                .or(fc.led.count)
                .unwrap_or(60),
            brightness: env("LED_BRIGHTNESS")
                .and_then(|v| v.trim().parse().ok())
                .or(fc.led.brightness)
                .unwrap_or(0.3)
                .clamp(0.0, 1.0),
            power_pin: env("LED_POWER_PIN")
                .and_then(|v| v.trim().parse().ok())
                .or(fc.led.power_pin)
                .unwrap_or(21),
            device: env("LED_DEVICE")
                .or(fc.led.device)
                .map_or_else(|| PathBuf::from("/dev/spidev0.0"), PathBuf::from),
            gpio_root: env("LED_GPIO_ROOT")
                .or(fc.led.gpio_root)
                .map_or_else(|| PathBuf::from("/sys/class/gpio"), PathBuf::from),
        };

        let defaults = TimingConfig::default();
        let ms = |v: Option<u64>, d: Duration| v.map_or(d, Duration::from_millis);
        let timings = TimingConfig {
            inter_turn: ms(fc.timings.inter_turn_ms, defaults.inter_turn),
            failure_backoff: ms(fc.timings.failure_backoff_ms, defaults.failure_backoff),
            emotion_dwell: ms(fc.timings.emotion_dwell_ms, defaults.emotion_dwell),
            warm_up: ms(fc.timings.warm_up_ms, defaults.warm_up),
        };

        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            tts_lang: env("TTS_LANG")
                .or(fc.server.tts_lang)
                .unwrap_or_else(|| "ko".to_string()),
            network_timeout: Duration::from_secs(fc.server.timeout_secs.unwrap_or(30)),
            audio,
            weather,
            conversation,
            led,
            timings,
        }
    }
}

/// Parse common truthy/falsy spellings
fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
