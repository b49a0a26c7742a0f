//! Backend adapters — the single dispatch surface every command origin
//! (stream client, REST caller, autonomous scheduler) is normalized onto.
//!
//! All variants expose the same four operations over a shared core that
//! holds the session's outbound handle and collaborator context. Variants
//! differ in delivery policy: `Internal` and `ExternalApi` serve direct
//! replies (bounded blocking enqueue), `Autonomous` is a broadcast producer
//! (try-send, drop on a slow session).

use async_trait::async_trait;
use base64::Engine as _;
use futures_util::StreamExt;
use marionette_core::types::BackendMode;
use marionette_core::{ControlError, Result};
use marionette_protocol::{Actions, AudioPayload, DisplayText, MotionSpec, ServerFrame};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::outbound::OutboundHandle;
use crate::session::SessionContext;

/// One speech command, from any origin.
#[derive(Debug, Clone, Default)]
pub struct SpeakRequest {
    pub text: Option<String>,
    pub expressions: Vec<u32>,
    pub motions: Vec<MotionSpec>,
    pub skip_tts: bool,
    /// Overrides the display metadata derived from the model descriptor.
    pub display: Option<DisplayText>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeakOutcome {
    pub tts_generated: bool,
}

/// Polymorphic command surface consumed by the router, registry, scheduler,
/// and chat pipeline.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    fn mode(&self) -> BackendMode;

    /// Emit an expression change. `duration_ms == 0` is permanent; a positive
    /// duration schedules a best-effort revert to the model default.
    async fn trigger_expression(
        &self,
        expression_id: i64,
        duration_ms: u64,
        priority: i32,
    ) -> Result<()>;

    /// Emit one motion from a named group.
    async fn trigger_motion(
        &self,
        group: &str,
        index: u32,
        looped: bool,
        priority: i32,
    ) -> Result<()>;

    /// Emit a speech frame (synthesized unless `skip_tts`), followed by the
    /// requested motion frames.
    async fn speak(&self, request: SpeakRequest) -> Result<SpeakOutcome>;

    /// Stream agent output as `text-generation-chunk` frames, close with a
    /// terminal `text-generation-response`, and return the accumulated text.
    async fn generate_text(&self, prompt: &str, context: &Value) -> Result<String>;
}

/// Build the adapter for `mode`. Called lazily by the owning session.
pub(crate) fn build(
    mode: BackendMode,
    outbound: OutboundHandle,
    context: SessionContext,
) -> Arc<dyn BackendAdapter> {
    let core = AdapterCore {
        outbound,
        context,
        direct: !matches!(mode, BackendMode::Autonomous),
    };
    Arc::new(ModeAdapter { mode, core })
}

/// Shared implementation behind every variant.
struct AdapterCore {
    outbound: OutboundHandle,
    context: SessionContext,
    /// Direct-reply delivery (bounded blocking) vs broadcast (try-send).
    direct: bool,
}

impl AdapterCore {
    async fn emit(&self, frame: ServerFrame) -> Result<()> {
        if self.direct {
            self.outbound.send(frame).await
        } else {
            // Best-effort path: a dropped frame is logged, not an error.
            self.outbound.try_send(frame);
            Ok(())
        }
    }

    async fn trigger_expression(
        &self,
        expression_id: i64,
        duration_ms: u64,
        _priority: i32,
    ) -> Result<()> {
        let model = &self.context.model;
        if expression_id < 0 || !model.has_expression(expression_id as u32) {
            return Err(ControlError::not_found(format!(
                "expression {expression_id}"
            )));
        }

        self.emit(ServerFrame::expression_ack_ok(expression_id)).await?;
        self.emit(ServerFrame::Audio(AudioPayload::expression_only(
            Actions::with_expressions(vec![expression_id as u32]),
        )))
        .await?;

        if duration_ms > 0 {
            let outbound = self.outbound.clone();
            let revert_to = model.default_expression;
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(duration_ms)).await;
                // Best-effort: the expiry races normal traffic by design of
                // the bounded queue; a full queue drops the revert.
                outbound.try_send(ServerFrame::Audio(AudioPayload::expression_only(
                    Actions::with_expressions(vec![revert_to]),
                )));
            });
        }
        Ok(())
    }

    async fn trigger_motion(
        &self,
        group: &str,
        index: u32,
        looped: bool,
        priority: i32,
    ) -> Result<()> {
        if !self.context.model.has_motion_group(group) {
            return Err(ControlError::not_found(format!("motion group '{group}'")));
        }

        self.emit(ServerFrame::motion_ack_ok(group, index)).await?;
        self.emit(ServerFrame::MotionCommand(MotionSpec {
            group: group.to_string(),
            index,
            looped,
            priority,
        }))
        .await?;
        Ok(())
    }

    async fn speak(&self, request: SpeakRequest) -> Result<SpeakOutcome> {
        let model = &self.context.model;
        for id in &request.expressions {
            if !model.has_expression(*id) {
                return Err(ControlError::not_found(format!("expression {id}")));
            }
        }
        for motion in &request.motions {
            if !model.has_motion_group(&motion.group) {
                return Err(ControlError::not_found(format!(
                    "motion group '{}'",
                    motion.group
                )));
            }
        }

        let text = request
            .text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());

        // Synthesize before emitting anything: a TTS failure must not leave
        // a partial frame sequence behind.
        let mut payload = AudioPayload::expression_only(Actions::with_expressions(
            request.expressions.clone(),
        ));
        let mut tts_generated = false;
        if let (Some(text), false) = (text, request.skip_tts) {
            if let Some(tts) = &self.context.tts {
                let speech = tts
                    .synthesize(text)
                    .await
                    .map_err(|e| ControlError::external(tts.engine_name(), e))?;
                payload.audio =
                    Some(base64::engine::general_purpose::STANDARD.encode(&speech.audio));
                payload.format = speech.format;
                payload.volumes = speech.volumes;
                payload.slice_length = speech.slice_length;
                tts_generated = true;
            } else {
                debug!("no synthesizer configured, emitting text-only speech frame");
            }
        }
        if let Some(text) = text {
            payload.display_text = Some(request.display.clone().unwrap_or(DisplayText {
                text: text.to_string(),
                name: model.character_name.clone(),
                avatar: model.avatar.clone(),
            }));
        }

        // Audio frame first, then the motion frames.
        self.emit(ServerFrame::Audio(payload)).await?;
        for motion in request.motions {
            self.emit(ServerFrame::MotionCommand(motion)).await?;
        }

        Ok(SpeakOutcome { tts_generated })
    }

    async fn generate_text(&self, prompt: &str, context: &Value) -> Result<String> {
        let mut stream = self.context.agent.generate_stream(prompt, context);
        let mut full = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                Ok(text) => {
                    full.push_str(&text);
                    self.emit(ServerFrame::TextGenerationChunk { text }).await?;
                }
                Err(e) => {
                    warn!(error = %e, "text generation failed mid-stream");
                    self.emit(ServerFrame::TextGenerationResponse {
                        text: full.clone(),
                        error: Some(e.to_string()),
                    })
                    .await?;
                    return Err(ControlError::external(
                        self.context.agent.engine_name(),
                        e,
                    ));
                }
            }
        }
        self.emit(ServerFrame::TextGenerationResponse {
            text: full.clone(),
            error: None,
        })
        .await?;
        Ok(full)
    }
}

/// Concrete adapter: the mode tag picks the delivery policy, the core does
/// the rest. Kept behind the trait so callers stay mockable and future
/// variants can diverge further.
struct ModeAdapter {
    mode: BackendMode,
    core: AdapterCore,
}

#[async_trait]
impl BackendAdapter for ModeAdapter {
    fn mode(&self) -> BackendMode {
        self.mode
    }

    async fn trigger_expression(
        &self,
        expression_id: i64,
        duration_ms: u64,
        priority: i32,
    ) -> Result<()> {
        self.core
            .trigger_expression(expression_id, duration_ms, priority)
            .await
    }

    async fn trigger_motion(
        &self,
        group: &str,
        index: u32,
        looped: bool,
        priority: i32,
    ) -> Result<()> {
        self.core.trigger_motion(group, index, looped, priority).await
    }

    async fn speak(&self, request: SpeakRequest) -> Result<SpeakOutcome> {
        self.core.speak(request).await
    }

    async fn generate_text(&self, prompt: &str, context: &Value) -> Result<String> {
        self.core.generate_text(prompt, context).await
    }
}
