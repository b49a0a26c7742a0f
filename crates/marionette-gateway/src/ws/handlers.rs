//! Inbound stream frame dispatch.
//!
//! Each frame type maps to one handler below. A frame that fails to parse
//! or to execute produces an `error` (or error ack) frame on the session's
//! outbound channel and never tears the stream down.

use futures_util::StreamExt;
use marionette_model::emotions;
use marionette_protocol::{AckStatus, ClientFrame, ServerFrame};
use marionette_sessions::{Session, SpeakRequest};
use std::sync::Arc;
use tracing::{debug, warn};

pub async fn handle_frame(session: &Arc<Session>, text: &str) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(session = %session.id(), error = %e, "unparseable inbound frame");
            let _ = session
                .outbound()
                .send(ServerFrame::error(format!("invalid frame: {e}")))
                .await;
            return;
        }
    };

    match frame {
        ClientFrame::ExpressionCommand {
            expression_id,
            duration_ms,
            priority,
        } => {
            if let Err(e) = session
                .adapter()
                .trigger_expression(expression_id, duration_ms, priority)
                .await
            {
                let _ = session
                    .outbound()
                    .send(ServerFrame::expression_ack_err(expression_id, e.to_string()))
                    .await;
            }
        }

        ClientFrame::MotionCommand {
            motion_group,
            motion_index,
            looped,
            priority,
        } => {
            if let Err(e) = session
                .adapter()
                .trigger_motion(&motion_group, motion_index, looped, priority)
                .await
            {
                let _ = session
                    .outbound()
                    .send(ServerFrame::motion_ack_err(
                        &motion_group,
                        motion_index,
                        e.to_string(),
                    ))
                    .await;
            }
        }

        ClientFrame::TextInput { text } => {
            handle_text_input(session, &text).await;
        }

        ClientFrame::TextGenerationRequest { prompt, context } => {
            // Chunk and terminal frames are emitted by the adapter itself;
            // a failure is already reflected in the terminal frame.
            if let Err(e) = session.adapter().generate_text(&prompt, &context).await {
                debug!(session = %session.id(), error = %e, "text generation request failed");
            }
        }

        ClientFrame::SetBackendMode { mode } => {
            session.set_mode(mode);
            let _ = session
                .outbound()
                .send(ServerFrame::BackendModeSet {
                    status: AckStatus::Success,
                    mode,
                })
                .await;
        }

        ClientFrame::GetBackendMode => {
            let _ = session
                .outbound()
                .send(ServerFrame::BackendModeSet {
                    status: AckStatus::Success,
                    mode: session.mode(),
                })
                .await;
        }

        ClientFrame::MicAudioData { audio } => {
            session.push_mic_audio(&audio);
        }

        ClientFrame::MicAudioEnd => {
            handle_mic_end(session).await;
        }
    }
}

/// One conversation turn: stream the agent's reply as `partial-text`
/// frames, close with `full-text`, then speak the tag-stripped reply with
/// its extracted expressions.
async fn handle_text_input(session: &Arc<Session>, text: &str) {
    let context = serde_json::json!({ "source": "text-input" });
    let mut reply = String::new();
    {
        let mut stream = session.context().agent.generate_stream(text, &context);
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(chunk) => {
                    let _ = session
                        .outbound()
                        .send(ServerFrame::PartialText {
                            text: chunk.clone(),
                        })
                        .await;
                    reply.push_str(&chunk);
                }
                Err(e) => {
                    warn!(session = %session.id(), error = %e, "agent reply failed");
                    let _ = session
                        .outbound()
                        .send(ServerFrame::error(format!("agent failure: {e}")))
                        .await;
                    return;
                }
            }
        }
    }

    let (expressions, display) =
        emotions::extract_and_strip(&reply, session.context().model.emotion_map());
    let display = display.trim().to_string();

    let _ = session
        .outbound()
        .send(ServerFrame::FullText {
            text: display.clone(),
        })
        .await;

    if let Err(e) = session
        .adapter()
        .speak(SpeakRequest {
            text: Some(display),
            expressions,
            ..Default::default()
        })
        .await
    {
        warn!(session = %session.id(), error = %e, "reply speech failed");
        let _ = session
            .outbound()
            .send(ServerFrame::error(format!("speech failure: {e}")))
            .await;
    }
}

/// Finish an utterance: take the buffered samples (late `mic-audio-data`
/// frames accumulate toward the next utterance), transcribe, reflect the
/// transcription, and run it through the conversation flow.
async fn handle_mic_end(session: &Arc<Session>) {
    let samples = session.take_mic_audio();
    if samples.is_empty() {
        debug!(session = %session.id(), "mic-audio-end with empty buffer");
        return;
    }

    let Some(asr) = session.context().asr.clone() else {
        let _ = session
            .outbound()
            .send(ServerFrame::error("no speech recognizer configured"))
            .await;
        return;
    };

    match asr.transcribe(&samples).await {
        Ok(text) if !text.trim().is_empty() => {
            let _ = session
                .outbound()
                .send(ServerFrame::UserInputTranscription { text: text.clone() })
                .await;
            handle_text_input(session, &text).await;
        }
        Ok(_) => {
            debug!(session = %session.id(), "empty transcription, nothing to do");
        }
        Err(e) => {
            warn!(session = %session.id(), error = %e, "transcription failed");
            let _ = session
                .outbound()
                .send(ServerFrame::error(format!("transcription failure: {e}")))
                .await;
        }
    }
}
