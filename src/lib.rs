//! Hearth - voice-interaction appliance controller
//!
//! This library provides the core functionality for the Hearth appliance:
//! - Session loop driving one conversational turn at a time
//! - Audio capture and playback through the ALSA utilities
//! - Speech-to-text and text-to-speech via a remote speech service
//! - Intent routing to weather or conversation providers
//! - LED status indicator reflecting the current phase
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Session Loop                       │
//! │  Recording → Transcribing → Routing → Synthesizing   │
//! │                     → Playing                        │
//! └───────┬──────────────────┬──────────────────┬───────┘
//!         │                  │                  │
//! ┌───────▼──────┐  ┌────────▼────────┐  ┌──────▼───────┐
//! │    Voice     │  │  Intent Router  │  │  Indicator   │
//! │ arecord/aplay│  │ weather │ chat  │  │  LED strip   │
//! │   STT/TTS    │  └────────┬────────┘  └──────────────┘
//! └──────────────┘           │
//!                   ┌────────▼────────┐
//!                   │    Providers    │
//!                   │ OpenWeatherMap  │
//!                   │ chat completions│
//!                   └─────────────────┘
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod indicator;
pub mod providers;
pub mod router;
pub mod session;
pub mod voice;

pub use config::Config;
pub use daemon::Daemon;
pub use error::{Error, ErrorKind, ProviderResponse, Result};
pub use indicator::{Color, IndicatorState, NullIndicator, StatusIndicator};
pub use router::{Intent, IntentRouter, Routed};
pub use session::{Components, LoopSettings, Phase, Session, SessionLoop, TurnOutcome};
