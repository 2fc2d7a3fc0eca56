//! Voice I/O
//!
//! Capture and playback go through the platform's ALSA utilities; STT and
//! TTS go through the remote speech service.

mod capture;
mod playback;
mod stt;
mod tts;
mod utility;
mod wav;

pub use capture::{ArecordCapture, CaptureGateway, UnavailableCapture};
pub use playback::{AplayPlayback, PlaybackGateway, UnavailablePlayback};
pub use stt::{HttpTranscriber, Transcriber, UnavailableTranscriber};
pub use tts::{HttpSynthesizer, Synthesizer, UnavailableSynthesizer};
pub use wav::{ClipInfo, clip_info, tone_wav};

pub(crate) use utility::remove_if_present;

use crate::error::{ProviderResponse, classify};
