//! Low-level ports for the pixel strip and its power-enable line

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::Rgb;
use crate::{Error, Result};

/// A fixed-length strip of addressable pixels
pub trait PixelStrip: Send {
    /// Set every pixel in the frame buffer to `rgb`
    fn fill(&mut self, rgb: Rgb);

    /// Push the frame buffer to the strip
    ///
    /// # Errors
    ///
    /// Returns error if the device write fails
    fn show(&mut self) -> Result<()>;
}

/// A discrete digital output gating the strip's supply
pub trait PowerLine: Send {
    /// Claim the line and configure it as an output
    ///
    /// # Errors
    ///
    /// Returns error if the line cannot be claimed
    fn setup(&mut self) -> Result<()>;

    /// Drive the line high or low
    ///
    /// # Errors
    ///
    /// Returns error if the line cannot be written
    fn set(&mut self, high: bool) -> Result<()>;

    /// Give the line back to the system; safe to call when never claimed
    ///
    /// # Errors
    ///
    /// Returns error if the release write fails
    fn release(&mut self) -> Result<()>;
}

/// Encode pixels as GRB byte triples scaled by `brightness`
#[must_use]
pub fn encode_frame(pixels: &[Rgb], brightness: f32) -> Vec<u8> {
    let scale = brightness.clamp(0.0, 1.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let dim = |c: u8| (f32::from(c) * scale).round() as u8;

    pixels
        .iter()
        .flat_map(|&Rgb(r, g, b)| [dim(g), dim(r), dim(b)])
        .collect()
}

/// Pixel strip fed through a device node (e.g. `/dev/spidev0.0`)
///
/// Each `show()` writes one full frame.
pub struct SpiPixelStrip {
    device: File,
    pixels: Vec<Rgb>,
    brightness: f32,
}

impl SpiPixelStrip {
    /// Open the strip's device node
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened for writing
    pub fn open(path: &Path, count: usize, brightness: f32) -> Result<Self> {
        let device = OpenOptions::new().write(true).open(path).map_err(|e| {
            Error::DeviceUnavailable(format!("cannot open {}: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), count, brightness, "pixel strip opened");

        Ok(Self {
            device,
            pixels: vec![Rgb(0, 0, 0); count],
            brightness,
        })
    }
}

impl PixelStrip for SpiPixelStrip {
    fn fill(&mut self, rgb: Rgb) {
        self.pixels.fill(rgb);
    }

    fn show(&mut self) -> Result<()> {
        let frame = encode_frame(&self.pixels, self.brightness);
        self.device
            .write_all(&frame)
            .and_then(|()| self.device.flush())
            .map_err(|e| Error::DeviceFailure(format!("pixel frame write failed: {e}")))
    }
}

/// Power line driven through the sysfs GPIO interface
pub struct SysfsPowerLine {
    root: PathBuf,
    pin: u32,
    exported: bool,
}

impl SysfsPowerLine {
    /// Create a handle for `pin` under `root` (usually `/sys/class/gpio`)
    #[must_use]
    pub const fn new(root: PathBuf, pin: u32) -> Self {
        Self {
            root,
            pin,
            exported: false,
        }
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    fn write(path: &Path, value: &str) -> Result<()> {
        std::fs::write(path, value).map_err(|e| {
            Error::DeviceFailure(format!("gpio write to {} failed: {e}", path.display()))
        })
    }
}

impl PowerLine for SysfsPowerLine {
    fn setup(&mut self) -> Result<()> {
        if !self.pin_dir().exists() {
            Self::write(&self.root.join("export"), &self.pin.to_string())?;
        }
        self.exported = true;
        Self::write(&self.pin_dir().join("direction"), "out")
    }

    fn set(&mut self, high: bool) -> Result<()> {
        Self::write(&self.pin_dir().join("value"), if high { "1" } else { "0" })
    }

    fn release(&mut self) -> Result<()> {
        if !self.exported {
            return Ok(());
        }
        self.exported = false;

        // Leave the supply off before handing the pin back
        let value = self.pin_dir().join("value");
        if value.exists() {
            Self::write(&value, "0")?;
        }
        Self::write(&self.root.join("unexport"), &self.pin.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_frame_grb_order() {
        let frame = encode_frame(&[Rgb(10, 20, 30)], 1.0);
        assert_eq!(frame, vec![20, 10, 30]);
    }

    #[test]
    fn test_encode_frame_brightness() {
        let frame = encode_frame(&[Rgb(255, 0, 100), Rgb(255, 0, 100)], 0.5);
        assert_eq!(frame, vec![0, 128, 50, 0, 128, 50]);
    }

    #[test]
    fn test_strip_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spidev");
        std::fs::write(&path, b"").unwrap();

        let mut strip = SpiPixelStrip::open(&path, 3, 1.0).unwrap();
        strip.fill(Rgb(255, 0, 0));
        strip.show().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![0, 255, 0, 0, 255, 0, 0, 255, 0]);
    }

    #[test]
    fn test_strip_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let err = SpiPixelStrip::open(&dir.path().join("nope/spidev"), 3, 1.0)
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::DeviceUnavailable);
    }

    #[test]
    fn test_sysfs_line_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        // Simulate the kernel having created the pin directory
        std::fs::create_dir_all(root.join("gpio21")).unwrap();

        let mut line = SysfsPowerLine::new(root.clone(), 21);
        line.setup().unwrap();
        assert_eq!(std::fs::read_to_string(root.join("gpio21/direction")).unwrap(), "out");

        line.set(true).unwrap();
        assert_eq!(std::fs::read_to_string(root.join("gpio21/value")).unwrap(), "1");

        line.release().unwrap();
        assert_eq!(std::fs::read_to_string(root.join("gpio21/value")).unwrap(), "0");
        assert_eq!(std::fs::read_to_string(root.join("unexport")).unwrap(), "21");
    }

    #[test]
    fn test_sysfs_release_without_setup() {
        let dir = tempfile::tempdir().unwrap();
        let mut line = SysfsPowerLine::new(dir.path().to_path_buf(), 21);
        assert!(line.release().is_ok());
        assert!(!dir.path().join("unexport").exists());
    }
}
