//! Shared test utilities
//!
//! Recording doubles for every collaborator of the session loop, plus a
//! harness that wires them together in a temporary work directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use hearth::config::TimingConfig;
use hearth::providers::{
    ConversationProvider, GenerationParams, Locality, UnavailableConversation, UnavailableWeather,
    WeatherProvider,
};
use hearth::voice::{CaptureGateway, PlaybackGateway, Synthesizer, Transcriber};
use hearth::{
    Color, Components, IntentRouter, LoopSettings, ProviderResponse, SessionLoop, StatusIndicator,
};

/// A call observed by one of the doubles
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Capture,
    Transcribe(Vec<u8>),
    Weather(Locality),
    Converse(String),
    Synthesize { text: String, locale: String },
    Play(Vec<u8>),
}

/// Ordered log of collaborator calls shared by all doubles
#[derive(Debug, Default)]
pub struct CallLog(Mutex<Vec<Call>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Indicator that records every color it is asked to show
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    colors: Mutex<Vec<Color>>,
    powered: Mutex<bool>,
    shutdowns: AtomicUsize,
}

impl RecordingIndicator {
    pub fn powered() -> Self {
        Self {
            powered: Mutex::new(true),
            ..Self::default()
        }
    }

    pub fn colors(&self) -> Vec<Color> {
        self.colors.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Color> {
        self.colors.lock().unwrap().last().copied()
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl StatusIndicator for RecordingIndicator {
    fn power_on(&self) -> bool {
        *self.powered.lock().unwrap() = true;
        true
    }

    fn power_off(&self) -> bool {
        *self.powered.lock().unwrap() = false;
        true
    }

    fn set_color(&self, color: Color) {
        if *self.powered.lock().unwrap() {
            self.colors.lock().unwrap().push(color);
        }
    }

    fn set_color_only(&self, color: Color) {
        self.colors.lock().unwrap().push(color);
    }

    fn shutdown(&self) {
        *self.powered.lock().unwrap() = false;
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }

    fn is_powered(&self) -> bool {
        *self.powered.lock().unwrap()
    }
}

/// Capture double writing a fixed clip to the target
pub struct FakeCapture {
    log: Arc<CallLog>,
    result: ProviderResponse<()>,
    audio: Vec<u8>,
    calls: AtomicUsize,
    stop_after: Option<(usize, mpsc::Sender<()>)>,
}

#[async_trait]
impl CaptureGateway for FakeCapture {
    async fn capture(&self, _duration: Duration, target: &Path) -> ProviderResponse<()> {
        self.log.push(Call::Capture);

        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, tx)) = &self.stop_after {
            if n >= *limit {
                let _ = tx.try_send(());
            }
        }

        let _ = std::fs::remove_file(target);
        if self.result.is_ok() {
            std::fs::create_dir_all(target.parent().unwrap()).unwrap();
            std::fs::write(target, &self.audio).unwrap();
        }
        self.result
    }
}

/// Transcriber double returning a fixed result
pub struct FakeTranscriber {
    log: Arc<CallLog>,
    result: ProviderResponse<String>,
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> ProviderResponse<String> {
        self.log.push(Call::Transcribe(audio.to_vec()));
        self.result.clone()
    }
}

/// Transcriber double that panics mid-turn
pub struct PanickingTranscriber;

#[async_trait]
impl Transcriber for PanickingTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> ProviderResponse<String> {
        panic!("transcriber exploded");
    }
}

/// Weather double answering with a canned summary
pub struct FakeWeather {
    log: Arc<CallLog>,
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn summary(&self, locality: &Locality) -> String {
        self.log.push(Call::Weather(locality.clone()));
        weather_summary(locality)
    }
}

/// Summary the weather double produces for `locality`
pub fn weather_summary(locality: &Locality) -> String {
    format!("{}의 현재 날씨는 맑음이며, 온도는 21.0°C 입니다.", locality.token())
}

/// Conversation double returning a fixed result
pub struct FakeConversation {
    log: Arc<CallLog>,
    result: ProviderResponse<String>,
}

#[async_trait]
impl ConversationProvider for FakeConversation {
    async fn reply(&self, text: &str, _params: &GenerationParams) -> ProviderResponse<String> {
        self.log.push(Call::Converse(text.to_string()));
        self.result.clone()
    }
}

/// Synthesizer double returning a fixed result
pub struct FakeSynthesizer {
    log: Arc<CallLog>,
    result: ProviderResponse<Vec<u8>>,
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, locale: &str) -> ProviderResponse<Vec<u8>> {
        self.log.push(Call::Synthesize {
            text: text.to_string(),
            locale: locale.to_string(),
        });
        self.result.clone()
    }
}

/// Playback double recording the bytes it was asked to play
pub struct FakePlayback {
    log: Arc<CallLog>,
    result: ProviderResponse<()>,
}

#[async_trait]
impl PlaybackGateway for FakePlayback {
    async fn play(&self, source: &Path) -> ProviderResponse<()> {
        let bytes = std::fs::read(source).unwrap_or_default();
        self.log.push(Call::Play(bytes));
        self.result
    }
}

/// Configurable wiring of doubles around a session loop
pub struct Harness {
    pub log: Arc<CallLog>,
    pub indicator: Arc<RecordingIndicator>,
    pub capture: ProviderResponse<()>,
    pub captured_audio: Vec<u8>,
    pub transcript: ProviderResponse<String>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub weather_available: bool,
    /// `None` leaves conversation unavailable
    pub conversation: Option<ProviderResponse<String>>,
    pub synthesis: ProviderResponse<Vec<u8>>,
    pub playback: ProviderResponse<()>,
    pub stop_after: Option<(usize, mpsc::Sender<()>)>,
    pub dir: tempfile::TempDir,
}

impl Harness {
    /// Every collaborator succeeds; the user asks for Seoul's weather
    pub fn new() -> Self {
        Self {
            log: Arc::new(CallLog::default()),
            indicator: Arc::new(RecordingIndicator::powered()),
            capture: Ok(()),
            captured_audio: hearth::voice::tone_wav(220.0, Duration::from_millis(50), 16000)
                .unwrap(),
            transcript: Ok("서울 날씨 알려줘".to_string()),
            transcriber: None,
            weather_available: true,
            conversation: Some(Ok("네, 무엇을 도와드릴까요?".to_string())),
            synthesis: Ok(hearth::voice::tone_wav(440.0, Duration::from_millis(50), 24000)
                .unwrap()),
            playback: Ok(()),
            stop_after: None,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn capture_path(&self) -> PathBuf {
        self.dir.path().join("recorded_audio.wav")
    }

    pub fn response_path(&self) -> PathBuf {
        self.dir.path().join("response.wav")
    }

    /// Build a session loop with no delays
    pub fn build(&self) -> SessionLoop {
        let indicator: Arc<dyn StatusIndicator> = self.indicator.clone();

        let weather: Arc<dyn WeatherProvider> = if self.weather_available {
            Arc::new(FakeWeather {
                log: self.log.clone(),
            })
        } else {
            Arc::new(UnavailableWeather)
        };
        let conversation: Arc<dyn ConversationProvider> = match &self.conversation {
            Some(result) => Arc::new(FakeConversation {
                log: self.log.clone(),
                result: result.clone(),
            }),
            None => Arc::new(UnavailableConversation),
        };

        let router = IntentRouter::new(weather, conversation, indicator.clone())
            .with_emotion_dwell(Duration::ZERO);

        let transcriber = self.transcriber.clone().unwrap_or_else(|| {
            Arc::new(FakeTranscriber {
                log: self.log.clone(),
                result: self.transcript.clone(),
            })
        });

        let components = Components {
            indicator,
            capture: Arc::new(FakeCapture {
                log: self.log.clone(),
                result: self.capture,
                audio: self.captured_audio.clone(),
                calls: AtomicUsize::new(0),
                stop_after: self.stop_after.clone(),
            }),
            transcriber,
            router,
            synthesizer: Arc::new(FakeSynthesizer {
                log: self.log.clone(),
                result: self.synthesis.clone(),
            }),
            playback: Arc::new(FakePlayback {
                log: self.log.clone(),
                result: self.playback,
            }),
        };

        let settings = LoopSettings {
            record_duration: Duration::from_secs(1),
            locale: "ko".to_string(),
            capture_path: self.capture_path(),
            response_path: self.response_path(),
            timings: TimingConfig::immediate(),
        };

        SessionLoop::new(components, settings)
    }
}
