//! Conversational turns
//!
//! A [`Session`] is the state of one turn. Its phase only moves forward:
//! `Idle → Recording → Transcribing → Routing → Synthesizing → Playing`,
//! with `Error` reachable from any of them and terminal for the turn.

mod runner;

pub use runner::{Components, EMPTY_REPLY_APOLOGY, LoopSettings, SessionLoop};

use std::fmt;

use crate::error::ErrorKind;
use crate::indicator::IndicatorState;
use crate::{Error, Result};

/// Where a turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Recording,
    Transcribing,
    Routing,
    Synthesizing,
    Playing,
    Error,
}

impl Phase {
    /// Indicator state shown while in this phase
    #[must_use]
    pub const fn indicator_state(self) -> IndicatorState {
        match self {
            Self::Idle => IndicatorState::Idle,
            Self::Recording => IndicatorState::Listening,
            Self::Transcribing | Self::Routing | Self::Synthesizing => IndicatorState::Thinking,
            Self::Playing => IndicatorState::Speaking,
            Self::Error => IndicatorState::Error,
        }
    }

    /// Position in the pipeline
    const fn order(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Recording => 1,
            Self::Transcribing => 2,
            Self::Routing => 3,
            Self::Synthesizing => 4,
            Self::Playing => 5,
            Self::Error => 6,
        }
    }

    /// Stable lowercase name for log output
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Transcribing => "transcribing",
            Self::Routing => "routing",
            Self::Synthesizing => "synthesizing",
            Self::Playing => "playing",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure recorded against a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnError {
    /// Phase that failed
    pub phase: Phase,
    pub kind: ErrorKind,
    pub message: String,
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Reply played back
    Completed,
    /// Nothing usable was said
    Skipped,
    /// A collaborator failed; the turn was cut short
    Failed { phase: Phase, kind: ErrorKind },
}

/// State of one conversational turn
///
/// Owns every buffer produced during the turn; dropping it releases them.
#[derive(Debug)]
pub struct Session {
    /// Monotonic turn number, starting at 1
    pub turn_id: u64,
    pub captured_audio: Vec<u8>,
    pub recognized_text: Option<String>,
    pub response_text: Option<String>,
    pub response_audio: Option<Vec<u8>>,
    phase: Phase,
    last_error: Option<TurnError>,
}

impl Session {
    /// Start turn `turn_id` in `Idle`
    #[must_use]
    pub const fn new(turn_id: u64) -> Self {
        Self {
            turn_id,
            captured_audio: Vec::new(),
            recognized_text: None,
            response_text: None,
            response_audio: None,
            phase: Phase::Idle,
            last_error: None,
        }
    }

    /// Current phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Failure recorded for this turn, if any
    #[must_use]
    pub const fn last_error(&self) -> Option<&TurnError> {
        self.last_error.as_ref()
    }

    /// Advance to `next`
    ///
    /// # Errors
    ///
    /// Returns error if `next` does not come after the current phase, or the
    /// turn has already failed
    pub fn enter(&mut self, next: Phase) -> Result<()> {
        if self.phase == Phase::Error || next.order() <= self.phase.order() {
            return Err(Error::Internal(format!(
                "turn {}: {next} cannot follow {}",
                self.turn_id, self.phase
            )));
        }

        self.phase = next;
        Ok(())
    }

    /// Record a failure in the current phase and move to `Error`
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) -> TurnOutcome {
        let phase = self.phase;
        self.last_error = Some(TurnError {
            phase,
            kind,
            message: message.into(),
        });
        self.phase = Phase::Error;
        TurnOutcome::Failed { phase, kind }
    }

    /// Record why the turn had nothing to act on; the phase is left as is
    pub fn skip(&mut self, message: impl Into<String>) -> TurnOutcome {
        self.last_error = Some(TurnError {
            phase: self.phase,
            kind: ErrorKind::EmptyInput,
            message: message.into(),
        });
        TurnOutcome::Skipped
    }
}
