//! WAV helpers for diagnostics and clip logging

use std::io::Cursor;
use std::time::Duration;

use crate::{Error, Result};

/// Header facts about a WAV clip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Frames per channel
    pub frames: u32,
}

impl ClipInfo {
    /// Playing time of the clip
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(f64::from(self.frames) / f64::from(self.sample_rate))
    }
}

/// Read the header of a WAV clip held in memory
///
/// # Errors
///
/// Returns error if the bytes are not a WAV file
pub fn clip_info(bytes: &[u8]) -> Result<ClipInfo> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| Error::MalformedResponse(format!("not a WAV clip: {e}")))?;
    let spec = reader.spec();

    Ok(ClipInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        bits_per_sample: spec.bits_per_sample,
        frames: reader.duration(),
    })
}

/// Render a mono 16-bit sine tone as WAV bytes
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn tone_wav(frequency: f32, duration: Duration, sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (f64::from(sample_rate) * duration.as_secs_f64()) as usize;

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| Error::Internal(e.to_string()))?;

        for i in 0..num_samples {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / sample_rate as f32;
            // 30% volume
            let sample = (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3;
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| Error::Internal(e.to_string()))?;
        }

        writer.finalize().map_err(|e| Error::Internal(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tone_header() {
        let wav = tone_wav(440.0, Duration::from_millis(100), 16000).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");

        let info = clip_info(&wav).unwrap();
        assert_eq!(info.sample_rate, 16000);
        assert_eq!(info.channels, 1);
        assert_eq!(info.bits_per_sample, 16);
        assert_eq!(info.frames, 1600);
        assert!((info.duration().as_secs_f64() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_clip_info_rejects_garbage() {
        let err = clip_info(b"definitely not audio").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedResponse);
    }
}
