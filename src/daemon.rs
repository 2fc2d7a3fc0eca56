//! Daemon - the appliance's main service
//!
//! Brings up the indicator, audio gateways, speech clients and providers,
//! then runs the session loop until interrupted. A component that fails to
//! come up is replaced by its unavailable stand-in so the loop always runs.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::{AudioConfig, LedConfig};
use crate::indicator::{
    IndicatorState, LedIndicator, NullIndicator, SettleDelays, SpiPixelStrip, StatusIndicator,
    SysfsPowerLine,
};
use crate::providers::{
    ChatCompletionsProvider, ConversationProvider, GenerationParams, OpenWeatherProvider,
    UnavailableConversation, UnavailableWeather, WeatherProvider,
};
use crate::router::IntentRouter;
use crate::session::{Components, LoopSettings, SessionLoop};
use crate::voice::{
    AplayPlayback, ArecordCapture, CaptureGateway, HttpSynthesizer, HttpTranscriber,
    PlaybackGateway, Synthesizer, Transcriber, UnavailableCapture, UnavailablePlayback,
    UnavailableSynthesizer, UnavailableTranscriber,
};
use crate::{Config, Result};

/// The Hearth daemon - runs conversational turns until interrupted
pub struct Daemon {
    config: Config,
}

impl Daemon {
    /// Create a new daemon instance
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// Start the daemon
    ///
    /// # Errors
    ///
    /// Returns error if the work directory cannot be created
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            server = %self.config.server_url,
            record_device = %self.config.audio.record_device,
            sample_rate = self.config.audio.sample_rate,
            seconds = self.config.audio.record_duration.as_secs(),
            "starting hearth"
        );

        tokio::fs::create_dir_all(&self.config.audio.work_dir).await?;

        let indicator = start_indicator(&self.config.led).await;
        let weather = build_weather(&self.config);
        let conversation = build_conversation(&self.config);

        let router = IntentRouter::new(weather, conversation, Arc::clone(&indicator))
            .with_params(GenerationParams::from(&self.config.conversation))
            .with_default_locality(self.config.weather.default_locality.clone())
            .with_emotion_dwell(self.config.timings.emotion_dwell);

        let components = Components {
            indicator,
            capture: build_capture(&self.config.audio),
            transcriber: build_transcriber(&self.config),
            router,
            synthesizer: build_synthesizer(&self.config),
            playback: build_playback(&self.config.audio),
        };

        // Set up shutdown signal
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });

        let settings = LoopSettings::from_config(&self.config);
        let mut session_loop = SessionLoop::new(components, settings);
        session_loop.run(&mut shutdown_rx).await;

        tracing::info!(turns = session_loop.turns(), "shutting down");
        session_loop.shutdown().await;

        Ok(())
    }
}

/// [`build_indicator`] on the blocking pool, for use from async code
pub async fn start_indicator(config: &LedConfig) -> Arc<dyn StatusIndicator> {
    let config = config.clone();
    tokio::task::spawn_blocking(move || build_indicator(&config))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "LED startup task failed, continuing without indicator");
            Arc::new(NullIndicator)
        })
}

/// Bring up the LED strip, powered and showing idle, or the null indicator
///
/// Sleeps through the strip's settle delays; async callers use
/// [`start_indicator`].
#[must_use]
pub fn build_indicator(config: &LedConfig) -> Arc<dyn StatusIndicator> {
    if !config.enabled {
        tracing::info!("LED disabled");
        return Arc::new(NullIndicator);
    }

    let strip = match SpiPixelStrip::open(&config.device, config.count, config.brightness) {
        Ok(strip) => strip,
        Err(e) => {
            tracing::warn!(
                device = %config.device.display(),
                kind = %e.kind(),
                error = %e,
                "LED strip unavailable, continuing without indicator"
            );
            return Arc::new(NullIndicator);
        }
    };
    let line = SysfsPowerLine::new(config.gpio_root.clone(), config.power_pin);

    let indicator = LedIndicator::new(strip, line, SettleDelays::default());
    if !indicator.init() {
        tracing::warn!("LED initialization failed, continuing without indicator");
        return Arc::new(NullIndicator);
    }

    if indicator.power_on() {
        indicator.show(IndicatorState::Idle);
        tracing::info!(pixels = config.count, pin = config.power_pin, "LED ready");
    } else {
        tracing::warn!("LED power-on failed; colors will be dropped");
    }

    Arc::new(indicator)
}

/// `arecord` capture, or unavailable if the utility is not installed
#[must_use]
pub fn build_capture(config: &AudioConfig) -> Arc<dyn CaptureGateway> {
    if which::which(&config.capture_binary).is_err() {
        tracing::warn!(
            binary = %config.capture_binary,
            "capture utility not found (is alsa-utils installed?)"
        );
        return Arc::new(UnavailableCapture);
    }
    Arc::new(ArecordCapture::new(config))
}

/// `aplay` playback, or unavailable if the utility is not installed
#[must_use]
pub fn build_playback(config: &AudioConfig) -> Arc<dyn PlaybackGateway> {
    if which::which(&config.playback_binary).is_err() {
        tracing::warn!(
            binary = %config.playback_binary,
            "playback utility not found (is alsa-utils installed?)"
        );
        return Arc::new(UnavailablePlayback);
    }
    Arc::new(AplayPlayback::new(config))
}

/// Speech service transcriber
#[must_use]
pub fn build_transcriber(config: &Config) -> Arc<dyn Transcriber> {
    match HttpTranscriber::new(&config.server_url, config.network_timeout) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "STT client unavailable");
            Arc::new(UnavailableTranscriber)
        }
    }
}

/// Speech service synthesizer
#[must_use]
pub fn build_synthesizer(config: &Config) -> Arc<dyn Synthesizer> {
    match HttpSynthesizer::new(&config.server_url, config.network_timeout) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "TTS client unavailable");
            Arc::new(UnavailableSynthesizer)
        }
    }
}

/// Weather provider, unavailable without an API key
#[must_use]
pub fn build_weather(config: &Config) -> Arc<dyn WeatherProvider> {
    if config.weather.api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set, weather disabled");
        return Arc::new(UnavailableWeather);
    }

    match OpenWeatherProvider::new(&config.weather, config.network_timeout) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!(error = %e, "weather provider unavailable");
            Arc::new(UnavailableWeather)
        }
    }
}

/// Conversation provider, unavailable without a server URL
#[must_use]
pub fn build_conversation(config: &Config) -> Arc<dyn ConversationProvider> {
    let Some(url) = config.conversation.url.as_deref() else {
        tracing::warn!("LM_STUDIO_URL not set, conversation disabled");
        return Arc::new(UnavailableConversation);
    };

    match ChatCompletionsProvider::new(
        url,
        config.conversation.model.clone(),
        config.conversation.timeout,
    ) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::warn!(error = %e, "conversation provider unavailable");
            Arc::new(UnavailableConversation)
        }
    }
}
