//! Session loop integration tests
//!
//! Drives whole turns through recording doubles; no audio hardware or
//! network needed.

use std::sync::Arc;

use tokio::sync::mpsc;

use hearth::providers::Locality;
use hearth::router::NO_PROVIDER_APOLOGY;
use hearth::session::EMPTY_REPLY_APOLOGY;
use hearth::{Color, ErrorKind, Phase, StatusIndicator, TurnOutcome};

mod common;

use common::{Call, Harness, PanickingTranscriber, weather_summary};

#[tokio::test]
async fn test_weather_turn_completes() {
    let harness = Harness::new();
    let mut session_loop = harness.build();

    let outcome = session_loop.run_turn().await.unwrap();

    assert_eq!(outcome, TurnOutcome::Completed);

    let seoul = Locality::Named("Seoul".to_string());
    let synthesized = harness.synthesis.clone().unwrap();
    assert_eq!(
        harness.log.calls(),
        vec![
            Call::Capture,
            Call::Transcribe(harness.captured_audio.clone()),
            Call::Weather(seoul.clone()),
            Call::Synthesize {
                text: weather_summary(&seoul),
                locale: "ko".to_string(),
            },
            Call::Play(synthesized),
        ]
    );

    assert_eq!(
        harness.indicator.colors(),
        vec![
            Color::Blue,
            Color::Yellow,
            Color::Yellow,
            Color::Yellow,
            Color::Green,
            Color::White,
        ]
    );
}

#[tokio::test]
async fn test_capture_failure_stops_turn() {
    let mut harness = Harness::new();
    harness.capture = Err(ErrorKind::DeviceFailure);
    let mut session_loop = harness.build();

    let outcome = session_loop.run_turn().await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Failed {
            phase: Phase::Recording,
            kind: ErrorKind::DeviceFailure,
        }
    );
    assert_eq!(harness.log.calls(), vec![Call::Capture]);
    assert_eq!(harness.indicator.colors(), vec![Color::Blue, Color::Red]);
}

#[tokio::test]
async fn test_empty_transcript_is_skipped() {
    let mut harness = Harness::new();
    harness.transcript = Ok(String::new());
    let mut session_loop = harness.build();

    let outcome = session_loop.run_turn().await.unwrap();

    assert_eq!(outcome, TurnOutcome::Skipped);
    assert_eq!(
        harness.log.calls(),
        vec![
            Call::Capture,
            Call::Transcribe(harness.captured_audio.clone())
        ]
    );
    assert_eq!(harness.indicator.last(), Some(Color::White));
}

#[tokio::test]
async fn test_short_transcripts_never_reach_providers() {
    for text in ["", " ", "네", "  a  ", "\n가\t"] {
        let mut harness = Harness::new();
        harness.transcript = Ok(text.to_string());
        let mut session_loop = harness.build();

        assert_eq!(
            session_loop.run_turn().await.unwrap(),
            TurnOutcome::Skipped,
            "text {text:?}"
        );
        assert_eq!(harness.log.calls().len(), 2, "text {text:?}");
        assert_eq!(harness.indicator.last(), Some(Color::White));
    }
}

#[tokio::test]
async fn test_two_characters_are_routed() {
    let mut harness = Harness::new();
    harness.transcript = Ok(" 안녕 ".to_string());
    let mut session_loop = harness.build();

    assert_eq!(session_loop.run_turn().await.unwrap(), TurnOutcome::Completed);
    assert!(harness.log.calls().contains(&Call::Converse("안녕".to_string())));
}

#[tokio::test]
async fn test_synthesis_failure_skips_playback() {
    let mut harness = Harness::new();
    harness.synthesis = Err(ErrorKind::ContentMissing);
    let mut session_loop = harness.build();

    let outcome = session_loop.run_turn().await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Failed {
            phase: Phase::Synthesizing,
            kind: ErrorKind::ContentMissing,
        }
    );
    assert!(
        !harness
            .log
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Play(_)))
    );
    assert_eq!(harness.indicator.last(), Some(Color::Red));
}

#[tokio::test]
async fn test_transcription_failure_shows_error() {
    let mut harness = Harness::new();
    harness.transcript = Err(ErrorKind::NetworkTimeout);
    let mut session_loop = harness.build();

    let outcome = session_loop.run_turn().await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Failed {
            phase: Phase::Transcribing,
            kind: ErrorKind::NetworkTimeout,
        }
    );
    assert_eq!(harness.log.calls().len(), 2);
    assert_eq!(harness.indicator.last(), Some(Color::Red));
}

#[tokio::test]
async fn test_playback_failure_still_cleans_up() {
    let mut harness = Harness::new();
    harness.playback = Err(ErrorKind::DeviceUnavailable);
    let mut session_loop = harness.build();

    let outcome = session_loop.run_turn().await.unwrap();

    assert_eq!(
        outcome,
        TurnOutcome::Failed {
            phase: Phase::Playing,
            kind: ErrorKind::DeviceUnavailable,
        }
    );
    assert!(!harness.capture_path().exists());
    assert!(!harness.response_path().exists());
}

#[tokio::test]
async fn test_turn_artifacts_removed() {
    let harness = Harness::new();
    let mut session_loop = harness.build();

    session_loop.run_turn().await.unwrap();

    assert!(!harness.capture_path().exists());
    assert!(!harness.response_path().exists());
}

#[tokio::test]
async fn test_empty_reply_replaced_by_apology() {
    let mut harness = Harness::new();
    harness.transcript = Ok("한국의 수도는 어디인가요".to_string());
    harness.conversation = Some(Err(ErrorKind::NetworkTimeout));
    let mut session_loop = harness.build();

    assert_eq!(session_loop.run_turn().await.unwrap(), TurnOutcome::Completed);
    assert!(harness.log.calls().contains(&Call::Synthesize {
        text: EMPTY_REPLY_APOLOGY.to_string(),
        locale: "ko".to_string(),
    }));
}

#[tokio::test]
async fn test_no_providers_apologizes() {
    let mut harness = Harness::new();
    harness.weather_available = false;
    harness.conversation = None;
    let mut session_loop = harness.build();

    assert_eq!(session_loop.run_turn().await.unwrap(), TurnOutcome::Completed);
    assert!(harness.log.calls().contains(&Call::Synthesize {
        text: NO_PROVIDER_APOLOGY.to_string(),
        locale: "ko".to_string(),
    }));
}

#[tokio::test]
async fn test_weather_falls_through_to_conversation() {
    let mut harness = Harness::new();
    harness.weather_available = false;
    let mut session_loop = harness.build();

    assert_eq!(session_loop.run_turn().await.unwrap(), TurnOutcome::Completed);
    assert!(
        harness
            .log
            .calls()
            .contains(&Call::Converse("서울 날씨 알려줘".to_string()))
    );
}

#[tokio::test]
async fn test_location_trigger_requests_geolocation() {
    let mut harness = Harness::new();
    harness.transcript = Ok("서울 말고 여기 날씨".to_string());
    let mut session_loop = harness.build();

    session_loop.run_turn().await.unwrap();
    assert!(harness.log.calls().contains(&Call::Weather(Locality::Auto)));
}

#[tokio::test]
async fn test_emotion_color_is_advisory() {
    let mut harness = Harness::new();
    harness.transcript = Ok("오늘 너무 짜증나".to_string());
    let mut session_loop = harness.build();

    assert_eq!(session_loop.run_turn().await.unwrap(), TurnOutcome::Completed);

    let colors = harness.indicator.colors();
    assert!(colors.contains(&Color::Red));
    assert_eq!(colors.last(), Some(&Color::White));
}

#[tokio::test]
async fn test_synthesized_audio_is_treated_like_live_capture() {
    let harness = Harness::new();
    let mut first = harness.build();
    assert_eq!(first.run_turn().await.unwrap(), TurnOutcome::Completed);
    let first_calls = harness.log.calls();

    let Some(Call::Play(played)) = first_calls.last().cloned() else {
        panic!("first turn did not play anything");
    };

    let mut replay = Harness::new();
    replay.captured_audio = played.clone();
    let mut second = replay.build();
    assert_eq!(second.run_turn().await.unwrap(), TurnOutcome::Completed);

    let second_calls = replay.log.calls();
    assert_eq!(second_calls[1], Call::Transcribe(played));
    assert_eq!(second_calls.len(), first_calls.len());
    assert_eq!(second_calls[2..], first_calls[2..]);
}

#[tokio::test]
async fn test_panic_is_contained() {
    let mut harness = Harness::new();
    harness.transcriber = Some(Arc::new(PanickingTranscriber));
    let mut session_loop = harness.build();

    let err = session_loop.run_turn().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().contains("transcriber exploded"));
    assert_eq!(harness.indicator.last(), Some(Color::Red));
    assert!(!harness.capture_path().exists());

    // The loop is still usable
    assert!(session_loop.run_turn().await.is_err());
    assert_eq!(session_loop.turns(), 2);
}

#[tokio::test]
async fn test_run_stops_at_turn_boundary() {
    let (tx, mut rx) = mpsc::channel(1);
    let mut harness = Harness::new();
    harness.stop_after = Some((2, tx));
    let mut session_loop = harness.build();

    session_loop.run(&mut rx).await;

    // The second turn still runs to completion
    assert_eq!(session_loop.turns(), 2);
    assert_eq!(harness.indicator.last(), Some(Color::White));
}

#[tokio::test]
async fn test_run_survives_failed_turns() {
    let (tx, mut rx) = mpsc::channel(1);
    let mut harness = Harness::new();
    harness.transcriber = Some(Arc::new(PanickingTranscriber));
    harness.stop_after = Some((3, tx));
    let mut session_loop = harness.build();

    session_loop.run(&mut rx).await;

    assert_eq!(session_loop.turns(), 3);
}

#[tokio::test]
async fn test_shutdown_before_first_turn() {
    let (tx, mut rx) = mpsc::channel(1);
    tx.send(()).await.unwrap();

    let harness = Harness::new();
    let mut session_loop = harness.build();
    session_loop.run(&mut rx).await;

    assert_eq!(session_loop.turns(), 0);
    assert!(harness.log.calls().is_empty());
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let harness = Harness::new();
    let session_loop = harness.build();

    session_loop.shutdown().await;
    session_loop.shutdown().await;

    assert_eq!(harness.indicator.shutdowns(), 2);
    assert!(!harness.indicator.is_powered());
}
