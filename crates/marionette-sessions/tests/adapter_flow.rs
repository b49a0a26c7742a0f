// End-to-end adapter behavior against a real session channel: frame
// ordering, validation, and TTS fallout.

use async_trait::async_trait;
use marionette_agent::stub::{CannedAgent, SilentSynthesizer};
use marionette_agent::{SpeechSynthesizer, SynthesizedSpeech};
use marionette_core::types::BackendMode;
use marionette_core::{ControlError, Result};
use marionette_model::LiveModelDescriptor;
use marionette_protocol::{AckStatus, MotionSpec, ServerFrame};
use marionette_sessions::{EngineSet, SessionRegistry, SpeakRequest};
use std::sync::Arc;
use std::time::Duration;

struct FailingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<SynthesizedSpeech> {
        Err(ControlError::external("tts", "voice model not loaded"))
    }

    fn engine_name(&self) -> &str {
        "failing"
    }
}

fn registry_with_tts(tts: Option<Arc<dyn SpeechSynthesizer>>) -> SessionRegistry {
    SessionRegistry::new(EngineSet {
        agent: Arc::new(CannedAgent::default()),
        tts,
        asr: None,
        model: Arc::new(LiveModelDescriptor::from_config(&Default::default())),
    })
}

async fn recv(
    rx: &mut tokio::sync::mpsc::Receiver<ServerFrame>,
) -> ServerFrame {
    tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("channel closed")
}

#[tokio::test]
async fn expression_command_emits_ack_then_expression_only_audio() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    session
        .adapter()
        .trigger_expression(3, 0, 10)
        .await
        .unwrap();

    match recv(&mut rx).await {
        ServerFrame::ExpressionAck {
            status,
            expression_id,
            error,
        } => {
            assert_eq!(status, AckStatus::Success);
            assert_eq!(expression_id, 3);
            assert!(error.is_none());
        }
        other => panic!("expected expression-ack, got {other:?}"),
    }
    match recv(&mut rx).await {
        ServerFrame::Audio(payload) => {
            assert!(payload.audio.is_none());
            assert_eq!(payload.actions.unwrap().expressions, vec![3]);
        }
        other => panic!("expected audio frame, got {other:?}"),
    }
    // no further frames — in particular no motion frame
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn invalid_expression_emits_nothing() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    let err = session
        .adapter()
        .trigger_expression(-1, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    let err = session
        .adapter()
        .trigger_expression(99, 0, 0)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn timed_expression_reverts_to_default() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    session
        .adapter()
        .trigger_expression(3, 50, 0)
        .await
        .unwrap();

    let _ack = recv(&mut rx).await;
    let _audio = recv(&mut rx).await;
    match recv(&mut rx).await {
        ServerFrame::Audio(payload) => {
            // default_expression of the default character config is 0
            assert_eq!(payload.actions.unwrap().expressions, vec![0]);
        }
        other => panic!("expected revert audio frame, got {other:?}"),
    }
}

#[tokio::test]
async fn motion_command_emits_ack_then_motion_frame() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    session
        .adapter()
        .trigger_motion("idle", 0, false, 5)
        .await
        .unwrap();

    match recv(&mut rx).await {
        ServerFrame::MotionAck {
            status,
            motion_group,
            motion_index,
            ..
        } => {
            assert_eq!(status, AckStatus::Success);
            assert_eq!(motion_group, "idle");
            assert_eq!(motion_index, 0);
        }
        other => panic!("expected motion-ack, got {other:?}"),
    }
    match recv(&mut rx).await {
        ServerFrame::MotionCommand(spec) => {
            assert_eq!(spec.group, "idle");
            assert_eq!(spec.index, 0);
            assert!(!spec.looped);
            assert_eq!(spec.priority, 5);
        }
        other => panic!("expected motion-command, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_motion_group_emits_nothing() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    let err = session
        .adapter()
        .trigger_motion("breakdance", 0, false, 0)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn speak_skip_tts_is_expression_only() {
    let reg = registry_with_tts(Some(Arc::new(SilentSynthesizer)));
    let (session, mut rx) = reg.connect();

    let outcome = session
        .adapter()
        .speak(SpeakRequest {
            expressions: vec![2],
            skip_tts: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(!outcome.tts_generated);
    match recv(&mut rx).await {
        ServerFrame::Audio(payload) => {
            assert!(payload.audio.is_none());
            assert_eq!(payload.actions.unwrap().expressions, vec![2]);
        }
        other => panic!("expected audio frame, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn speak_synthesizes_and_fills_display_text() {
    let reg = registry_with_tts(Some(Arc::new(SilentSynthesizer)));
    let (session, mut rx) = reg.connect();

    let outcome = session
        .adapter()
        .speak(SpeakRequest {
            text: Some("hello viewers".to_string()),
            expressions: vec![3],
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(outcome.tts_generated);
    match recv(&mut rx).await {
        ServerFrame::Audio(payload) => {
            assert!(payload.audio.is_some());
            assert!(!payload.volumes.is_empty());
            let display = payload.display_text.unwrap();
            assert_eq!(display.text, "hello viewers");
            assert_eq!(display.name, "Mari");
        }
        other => panic!("expected audio frame, got {other:?}"),
    }
}

#[tokio::test]
async fn speak_emits_audio_before_motions() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    session
        .adapter()
        .speak(SpeakRequest {
            expressions: vec![1],
            motions: vec![
                MotionSpec {
                    group: "idle".into(),
                    index: 1,
                    looped: false,
                    priority: 0,
                },
                MotionSpec {
                    group: "tap_body".into(),
                    index: 0,
                    looped: true,
                    priority: 3,
                },
            ],
            skip_tts: true,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(matches!(recv(&mut rx).await, ServerFrame::Audio(_)));
    match recv(&mut rx).await {
        ServerFrame::MotionCommand(spec) => assert_eq!(spec.group, "idle"),
        other => panic!("expected first motion, got {other:?}"),
    }
    match recv(&mut rx).await {
        ServerFrame::MotionCommand(spec) => assert_eq!(spec.group, "tap_body"),
        other => panic!("expected second motion, got {other:?}"),
    }
}

#[tokio::test]
async fn tts_failure_emits_no_partial_frames() {
    let reg = registry_with_tts(Some(Arc::new(FailingSynthesizer)));
    let (session, mut rx) = reg.connect();

    let err = session
        .adapter()
        .speak(SpeakRequest {
            text: Some("this will fail".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), "EXTERNAL_SERVICE_ERROR");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn generate_text_streams_chunks_then_terminal_response() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();

    let full = session
        .adapter()
        .generate_text("say hi", &serde_json::Value::Null)
        .await
        .unwrap();
    assert!(!full.is_empty());

    let mut saw_chunk = false;
    loop {
        match recv(&mut rx).await {
            ServerFrame::TextGenerationChunk { .. } => saw_chunk = true,
            ServerFrame::TextGenerationResponse { text, error } => {
                assert_eq!(text, full);
                assert!(error.is_none());
                break;
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }
    assert!(saw_chunk);
}

#[tokio::test]
async fn autonomous_adapter_drops_instead_of_blocking() {
    let reg = registry_with_tts(None);
    let (session, mut rx) = reg.connect();
    session.set_mode(BackendMode::Autonomous);

    // Fill the bounded queue without draining it.
    while session.outbound().try_send(ServerFrame::error("filler")) {}

    // The autonomous delivery path must not block even though the queue is
    // full; the speak call returns immediately with dropped frames.
    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        session.adapter().speak(SpeakRequest {
            expressions: vec![3],
            skip_tts: true,
            ..Default::default()
        }),
    )
    .await
    .expect("autonomous speak must not block on a slow session")
    .unwrap();
    assert!(!outcome.tts_generated);

    // Drain: only filler errors were queued.
    while let Ok(frame) = rx.try_recv() {
        assert!(matches!(frame, ServerFrame::Error { .. }));
    }
}
