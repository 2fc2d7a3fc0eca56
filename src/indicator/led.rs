//! LED strip status indicator with a switched power supply

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Color, PixelStrip, PowerLine, StatusIndicator};
use crate::Result;

/// Delays that let the supply and the strip settle after a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleDelays {
    /// Wait after enabling or disabling the supply
    pub power: Duration,
    /// Wait after pushing a frame before cutting power
    pub frame: Duration,
}

impl Default for SettleDelays {
    fn default() -> Self {
        Self {
            power: Duration::from_millis(100),
            frame: Duration::from_millis(50),
        }
    }
}

impl SettleDelays {
    /// No waiting, for tests
    #[must_use]
    pub const fn none() -> Self {
        Self {
            power: Duration::ZERO,
            frame: Duration::ZERO,
        }
    }
}

struct LedState<S, P> {
    strip: S,
    line: P,
    initialized: bool,
    powered: bool,
    shown: Option<Color>,
}

impl<S: PixelStrip, P: PowerLine> LedState<S, P> {
    fn push(&mut self, color: Color) -> Result<()> {
        self.strip.fill(color.rgb());
        self.strip.show()?;
        self.shown = Some(color);
        Ok(())
    }

    fn init(&mut self) -> Result<()> {
        self.line.setup()?;
        self.line.set(false)?;
        self.powered = false;
        self.push(Color::Off)
    }

    fn power_off(&mut self, settle: SettleDelays) -> Result<()> {
        let cleared = self.push(Color::Off);
        pause(settle.frame);
        // The line must go low even if the frame write failed
        let result = self.line.set(false);
        self.powered = false;
        pause(settle.power);
        cleared.and(result)
    }
}

/// Status indicator backed by a pixel strip and a power-enable line
///
/// Owns the hardware for its whole lifetime; `init` and `shutdown` bracket
/// its use. All state lives behind one lock so the indicator can be shared.
///
/// Power changes sleep the calling thread for the settle delays while the
/// lock is held. Async code runs `init`, `power_on` and `shutdown` through
/// [`super::release_indicator`] or `spawn_blocking`.
pub struct LedIndicator<S, P> {
    state: Mutex<LedState<S, P>>,
    settle: SettleDelays,
}

impl<S: PixelStrip, P: PowerLine> LedIndicator<S, P> {
    /// Wrap the strip and line; no hardware is touched until `init`
    pub const fn new(strip: S, line: P, settle: SettleDelays) -> Self {
        Self {
            state: Mutex::new(LedState {
                strip,
                line,
                initialized: false,
                powered: false,
                shown: None,
            }),
            settle,
        }
    }

    /// Claim the power line (low) and blank the strip
    ///
    /// On failure the line is released again and `false` is returned.
    pub fn init(&self) -> bool {
        let mut state = self.lock();
        if state.initialized {
            return true;
        }

        match state.init() {
            Ok(()) => {
                state.initialized = true;
                tracing::info!("led indicator initialized");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, kind = %e.kind(), "led indicator init failed");
                if let Err(e) = state.line.release() {
                    tracing::debug!(error = %e, "power line release after failed init");
                }
                false
            }
        }
    }

    /// Whether `init` has succeeded and `shutdown` has not run since
    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Last color successfully written to the strip
    pub fn shown(&self) -> Option<Color> {
        self.lock().shown
    }

    fn lock(&self) -> MutexGuard<'_, LedState<S, P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: PixelStrip, P: PowerLine> StatusIndicator for LedIndicator<S, P> {
    fn power_on(&self) -> bool {
        let mut state = self.lock();
        if !state.initialized {
            tracing::warn!("led power on requested before init");
            return false;
        }
        if state.powered {
            return true;
        }

        match state.line.set(true) {
            Ok(()) => {
                state.powered = true;
                pause(self.settle.power);
                tracing::debug!("led power on");
                true
            }
            Err(e) => {
                state.powered = false;
                tracing::warn!(error = %e, "led power on failed");
                false
            }
        }
    }

    fn power_off(&self) -> bool {
        let mut state = self.lock();
        if !state.initialized {
            return false;
        }
        if !state.powered {
            return true;
        }

        match state.power_off(self.settle) {
            Ok(()) => {
                tracing::debug!("led power off");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "led power off failed");
                false
            }
        }
    }

    fn set_color(&self, color: Color) {
        let mut state = self.lock();
        if !state.initialized {
            tracing::debug!(%color, "led not initialized, color change ignored");
            return;
        }
        if !state.powered {
            tracing::warn!(%color, "led not powered, color change ignored");
            return;
        }

        if let Err(e) = state.push(color) {
            tracing::warn!(%color, error = %e, "led color change failed");
        }
    }

    fn set_color_only(&self, color: Color) {
        let mut state = self.lock();
        if !state.initialized {
            tracing::debug!(%color, "led not initialized, frame dropped");
            return;
        }

        if let Err(e) = state.push(color) {
            tracing::warn!(%color, error = %e, "led frame write failed");
        }
    }

    fn shutdown(&self) {
        let mut state = self.lock();

        if state.initialized {
            if state.powered {
                if let Err(e) = state.power_off(self.settle) {
                    tracing::warn!(error = %e, "led power off during shutdown failed");
                }
            }
            state.initialized = false;
            tracing::info!("led indicator shut down");
        }

        state.powered = false;
        if let Err(e) = state.line.release() {
            tracing::warn!(error = %e, "power line release failed");
        }
    }

    fn is_powered(&self) -> bool {
        self.lock().powered
    }
}

/// Blocks the current thread
fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
