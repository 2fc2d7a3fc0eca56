//! Status indicator
//!
//! Reflects the session phase on an LED strip. Every call is best-effort:
//! implementations log their own failures and never surface them to the
//! session loop.

mod hardware;
mod led;

pub use hardware::{PixelStrip, PowerLine, SpiPixelStrip, SysfsPowerLine, encode_frame};
pub use led::{LedIndicator, SettleDelays};

use std::fmt;
use std::sync::Arc;

/// RGB triple sent to the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Fixed palette the strip can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Red,
    Green,
    Blue,
    Yellow,
    Off,
}

impl Color {
    /// RGB value of this palette entry
    #[must_use]
    pub const fn rgb(self) -> Rgb {
        match self {
            Self::White => Rgb(255, 255, 255),
            Self::Red => Rgb(255, 0, 0),
            Self::Green => Rgb(0, 255, 0),
            Self::Blue => Rgb(0, 0, 255),
            Self::Yellow => Rgb(255, 255, 0),
            Self::Off => Rgb(0, 0, 0),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::White => "white",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Yellow => "yellow",
            Self::Off => "off",
        };
        f.write_str(name)
    }
}

/// What the appliance is doing, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorState {
    Idle,
    Listening,
    Thinking,
    Speaking,
    Error,
    Off,
}

impl IndicatorState {
    /// Palette color for this state
    #[must_use]
    pub const fn color(self) -> Color {
        match self {
            Self::Idle => Color::White,
            Self::Listening => Color::Blue,
            Self::Thinking => Color::Yellow,
            Self::Speaking => Color::Green,
            Self::Error => Color::Red,
            Self::Off => Color::Off,
        }
    }
}

/// Capability interface for the status device
///
/// None of these methods may panic or propagate hardware errors.
pub trait StatusIndicator: Send + Sync {
    /// Enable the strip's power line
    fn power_on(&self) -> bool;

    /// Clear the strip and disable its power line
    fn power_off(&self) -> bool;

    /// Show `color`; a logged no-op while unpowered
    fn set_color(&self, color: Color);

    /// Write `color` to the strip without requiring power
    fn set_color_only(&self, color: Color);

    /// Release all hardware; idempotent
    fn shutdown(&self);

    /// Whether the power line is currently enabled
    fn is_powered(&self) -> bool;

    /// Show the color for `state`
    fn show(&self, state: IndicatorState) {
        self.set_color(state.color());
    }
}

/// Shut `indicator` down on the blocking pool
///
/// Hardware indicators sleep through their settle delays; this keeps that
/// off the async worker threads.
pub async fn release_indicator(indicator: Arc<dyn StatusIndicator>) {
    if let Err(e) = tokio::task::spawn_blocking(move || indicator.shutdown()).await {
        tracing::warn!(error = %e, "indicator shutdown task failed");
    }
}

/// Indicator used when no LED hardware is available
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn power_on(&self) -> bool {
        false
    }

    fn power_off(&self) -> bool {
        false
    }

    fn set_color(&self, color: Color) {
        tracing::trace!(%color, "indicator unavailable, color dropped");
    }

    fn set_color_only(&self, _color: Color) {}

    fn shutdown(&self) {}

    fn is_powered(&self) -> bool {
        false
    }
}
