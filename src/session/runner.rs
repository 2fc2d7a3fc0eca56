//! The session loop: one turn at a time, forever, until shutdown

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use super::{Phase, Session, TurnOutcome};
use crate::config::{Config, TimingConfig};
use crate::error::ErrorKind;
use crate::indicator::{IndicatorState, StatusIndicator, release_indicator};
use crate::router::{IntentRouter, Routed, is_routable};
use crate::voice::{CaptureGateway, PlaybackGateway, Synthesizer, Transcriber, remove_if_present};
use crate::{Error, Result};

/// Spoken when a provider answered with nothing
pub const EMPTY_REPLY_APOLOGY: &str = "죄송합니다. 요청을 처리하지 못했습니다.";

/// Collaborators driven by the loop
pub struct Components {
    pub indicator: Arc<dyn StatusIndicator>,
    pub capture: Arc<dyn CaptureGateway>,
    pub transcriber: Arc<dyn Transcriber>,
    pub router: IntentRouter,
    pub synthesizer: Arc<dyn Synthesizer>,
    pub playback: Arc<dyn PlaybackGateway>,
}

/// Fixed per-run settings
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Length of each capture
    pub record_duration: Duration,
    /// Voice locale passed to synthesis
    pub locale: String,
    /// Where captured audio is written
    pub capture_path: PathBuf,
    /// Where synthesized audio is written before playback
    pub response_path: PathBuf,
    pub timings: TimingConfig,
}

impl LoopSettings {
    /// Settings from the loaded configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            record_duration: config.audio.record_duration,
            locale: config.tts_lang.clone(),
            capture_path: config.audio.capture_path(),
            response_path: config.audio.response_path(),
            timings: config.timings,
        }
    }
}

/// Drives capture → transcription → routing → synthesis → playback
pub struct SessionLoop {
    components: Components,
    settings: LoopSettings,
    turns: u64,
}

impl SessionLoop {
    /// Create a loop; no turn runs until [`Self::run`] or [`Self::run_turn`]
    #[must_use]
    pub const fn new(components: Components, settings: LoopSettings) -> Self {
        Self {
            components,
            settings,
            turns: 0,
        }
    }

    /// Number of turns started so far
    #[must_use]
    pub const fn turns(&self) -> u64 {
        self.turns
    }

    /// Run turns until `shutdown` fires or its sender is dropped
    ///
    /// The signal is checked at every turn boundary and interrupts the
    /// delays between turns; a turn in progress always runs to cleanup.
    pub async fn run(&mut self, shutdown: &mut mpsc::Receiver<()>) {
        tracing::info!("session loop ready");

        if wait(self.settings.timings.warm_up, shutdown).await {
            tracing::info!("shutdown requested");
            return;
        }

        loop {
            match shutdown.try_recv() {
                Ok(()) | Err(TryRecvError::Disconnected) => {
                    tracing::info!("shutdown requested");
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            let pause = match self.run_turn().await {
                Ok(outcome) => {
                    tracing::info!(turn = self.turns, outcome = ?outcome, "turn finished");
                    self.settings.timings.inter_turn
                }
                Err(e) => {
                    tracing::error!(
                        turn = self.turns,
                        kind = %e.kind(),
                        error = %e,
                        "turn aborted, backing off"
                    );
                    self.settings.timings.failure_backoff
                }
            };

            if wait(pause, shutdown).await {
                tracing::info!("shutdown requested");
                break;
            }
        }
    }

    /// Run exactly one turn, including cleanup
    ///
    /// Collaborator failures are part of the turn's outcome. Only unexpected
    /// failures, panics included, come back as errors.
    ///
    /// # Errors
    ///
    /// Returns error if the turn broke an invariant or panicked
    pub async fn run_turn(&mut self) -> Result<TurnOutcome> {
        self.turns += 1;
        let mut session = Session::new(self.turns);
        tracing::info!(turn = session.turn_id, "turn starting");

        let driven = AssertUnwindSafe(self.drive(&mut session))
            .catch_unwind()
            .await;

        let driven = driven.unwrap_or_else(|payload| {
            Err(Error::Internal(format!(
                "turn panicked: {}",
                panic_message(&*payload)
            )))
        });

        let result = settle(&mut session, driven);
        if result.is_err() {
            self.components.indicator.show(IndicatorState::Error);
        }

        self.cleanup(&session, &result).await;
        result
    }

    /// Release hardware held by the loop's collaborators
    pub async fn shutdown(&self) {
        release_indicator(Arc::clone(&self.components.indicator)).await;
    }

    async fn drive(&self, session: &mut Session) -> Result<TurnOutcome> {
        let c = &self.components;
        let s = &self.settings;

        self.enter(session, Phase::Recording)?;
        if let Err(kind) = c.capture.capture(s.record_duration, &s.capture_path).await {
            return Ok(self.fail(session, kind, "capture failed"));
        }
        match tokio::fs::read(&s.capture_path).await {
            Ok(audio) => session.captured_audio = audio,
            Err(e) => {
                let e = Error::from(e);
                let message = format!("captured audio unreadable: {e}");
                return Ok(self.fail(session, e.kind(), message));
            }
        }
        tracing::info!(
            turn = session.turn_id,
            bytes = session.captured_audio.len(),
            "audio captured"
        );

        self.enter(session, Phase::Transcribing)?;
        let text = match c.transcriber.transcribe(&session.captured_audio).await {
            Ok(text) => text,
            Err(kind) => return Ok(self.fail(session, kind, "transcription failed")),
        };
        tracing::info!(turn = session.turn_id, text = %text, "speech recognized");

        let routable = is_routable(&text);
        session.recognized_text = Some(text);
        if !routable {
            return Err(Error::EmptyInput("recognized text too short".to_string()));
        }

        self.enter(session, Phase::Routing)?;
        let response = match c.router.route(session.recognized_text.as_deref()).await {
            Routed::Skipped => return Err(Error::EmptyInput("nothing to route".to_string())),
            Routed::Reply { intent, text } => {
                tracing::info!(turn = session.turn_id, intent = ?intent, "response ready");
                text.unwrap_or_else(|| EMPTY_REPLY_APOLOGY.to_string())
            }
        };
        tracing::debug!(turn = session.turn_id, response = %response, "response text");
        session.response_text = Some(response.clone());

        self.enter(session, Phase::Synthesizing)?;
        let audio = match c.synthesizer.synthesize(&response, &s.locale).await {
            Ok(audio) => audio,
            Err(kind) => return Ok(self.fail(session, kind, "synthesis failed")),
        };
        if let Err(e) = write_clip(&s.response_path, &audio).await {
            return Ok(self.fail(session, e.kind(), format!("response audio unwritable: {e}")));
        }
        session.response_audio = Some(audio);

        self.enter(session, Phase::Playing)?;
        if let Err(kind) = c.playback.play(&s.response_path).await {
            return Ok(self.fail(session, kind, "playback failed"));
        }

        Ok(TurnOutcome::Completed)
    }

    fn enter(&self, session: &mut Session, phase: Phase) -> Result<()> {
        session.enter(phase)?;
        tracing::debug!(turn = session.turn_id, phase = %phase, "phase");
        self.components.indicator.show(phase.indicator_state());
        Ok(())
    }

    fn fail(
        &self,
        session: &mut Session,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> TurnOutcome {
        let message = message.into();
        tracing::warn!(
            turn = session.turn_id,
            phase = %session.phase(),
            kind = %kind,
            "{message}"
        );
        self.components.indicator.show(IndicatorState::Error);
        session.fail(kind, message)
    }

    async fn cleanup(&self, session: &Session, result: &Result<TurnOutcome>) {
        for path in [&self.settings.capture_path, &self.settings.response_path] {
            if let Err(e) = remove_if_present(path).await {
                tracing::warn!(
                    turn = session.turn_id,
                    path = %path.display(),
                    error = %e,
                    "failed to remove turn audio"
                );
            }
        }

        let error_shown = !matches!(result, Ok(TurnOutcome::Completed | TurnOutcome::Skipped));
        if !error_shown {
            self.components.indicator.show(IndicatorState::Idle);
        }
    }
}

/// Fold the driven result into the session record
///
/// Empty input ends the turn as skipped; any other error fails it.
fn settle(session: &mut Session, driven: Result<TurnOutcome>) -> Result<TurnOutcome> {
    match driven {
        Err(e) if e.is_skip() => {
            tracing::info!(turn = session.turn_id, kind = %e.kind(), "{e}, skipping");
            Ok(session.skip(e.to_string()))
        }
        Err(e) => {
            session.fail(e.kind(), e.to_string());
            Err(e)
        }
        ok => ok,
    }
}

/// Sleep for `delay`; true if shutdown arrived first
async fn wait(delay: Duration, shutdown: &mut mpsc::Receiver<()>) -> bool {
    tokio::select! {
        _ = shutdown.recv() => true,
        () = tokio::time::sleep(delay) => false,
    }
}

async fn write_clip(path: &std::path::Path, audio: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, audio).await?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
